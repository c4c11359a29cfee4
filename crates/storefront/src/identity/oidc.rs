//! `OpenID` Connect identity provider client.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use shopfront_core::Principal;

use super::{AuthorizationRequest, IdentityError, IdentityProvider};
use crate::config::IdentityConfig;

/// Token endpoint response (only the fields we use).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Userinfo endpoint response (only the fields we use).
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
}

/// Identity provider speaking OAuth 2.0 + `OpenID` Connect.
///
/// The principal is the provider's `sub` claim for the authenticated user.
#[derive(Clone)]
pub struct OidcIdentityProvider {
    inner: Arc<OidcInner>,
}

struct OidcInner {
    client: reqwest::Client,
    authorize_url: Url,
    token_url: Url,
    userinfo_url: Url,
    logout_url: Option<Url>,
    client_id: String,
    client_secret: SecretString,
}

impl OidcIdentityProvider {
    /// Create a new provider client.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            inner: Arc::new(OidcInner {
                client: reqwest::Client::new(),
                authorize_url: config.authorize_url.clone(),
                token_url: config.token_url.clone(),
                userinfo_url: config.userinfo_url.clone(),
                logout_url: config.logout_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            }),
        }
    }

    async fn fetch_access_token(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<String, IdentityError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .inner
            .client
            .post(self.inner.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::OAuth(format!(
                "Token exchange failed ({status}): {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_subject(&self, access_token: &str) -> Result<String, IdentityError> {
        let response = self
            .inner
            .client
            .get(self.inner.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::OAuth(format!(
                "Userinfo request failed ({})",
                response.status()
            )));
        }

        let info: UserInfo = response.json().await?;
        Ok(info.sub)
    }
}

#[async_trait]
impl IdentityProvider for OidcIdentityProvider {
    fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> String {
        with_query(
            &self.inner.authorize_url,
            &[
                ("client_id", &self.inner.client_id),
                ("response_type", "code"),
                ("redirect_uri", request.redirect_uri),
                ("scope", "openid"),
                ("state", request.state),
                ("code_challenge", request.code_challenge),
                ("code_challenge_method", "S256"),
            ],
        )
    }

    #[instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<Principal, IdentityError> {
        let access_token = self
            .fetch_access_token(code, redirect_uri, code_verifier)
            .await?;
        let subject = self.fetch_subject(&access_token).await?;
        Ok(Principal::parse(&subject)?)
    }

    fn logout_url(&self, post_logout_redirect_uri: &str) -> Option<String> {
        self.inner.logout_url.as_ref().map(|url| {
            with_query(
                url,
                &[
                    ("client_id", &self.inner.client_id),
                    ("post_logout_redirect_uri", post_logout_redirect_uri),
                ],
            )
        })
    }
}

/// Append URL-encoded query pairs, keeping any query the base already has.
fn with_query(base: &Url, pairs: &[(&str, &str)]) -> String {
    let separator = if base.query().is_some() { '&' } else { '?' };
    let query = pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}{separator}{query}")
}
