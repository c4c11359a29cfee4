//! External identity provider integration.
//!
//! Login is delegated entirely to the provider; the storefront only keeps the
//! resulting [`Principal`]. Uses OAuth 2.0 authorization code with PKCE.
//!
//! # OAuth Flow
//!
//! 1. Generate `state` and a PKCE verifier, keep both in the handshake session
//! 2. Redirect the customer to [`IdentityProvider::authorization_url`]
//! 3. The provider redirects back with an authorization code
//! 4. Exchange the code with [`IdentityProvider::exchange_code`] for a principal
//! 5. Persist the principal in the login cookie
//!
//! Logout erases the login cookie first and then sends the browser to
//! [`IdentityProvider::logout_url`], if the provider has one.

mod oidc;

pub use oidc::OidcIdentityProvider;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use shopfront_core::{Principal, PrincipalError};

/// Errors that can occur while talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token exchange or userinfo request was refused.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The provider returned an identifier we cannot store.
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(#[from] PrincipalError),
}

/// Parameters of one authorization redirect.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    /// Callback URL registered with the provider.
    pub redirect_uri: &'a str,
    /// CSRF state echoed back on the callback.
    pub state: &'a str,
    /// PKCE S256 challenge derived from the verifier.
    pub code_challenge: &'a str,
}

/// An external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to for login.
    fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> String;

    /// Exchange an authorization code for the authenticated principal.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<Principal, IdentityError>;

    /// URL that ends the provider-side session, if the provider supports it.
    fn logout_url(&self, post_logout_redirect_uri: &str) -> Option<String>;
}

/// Generate a cryptographically secure random string.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            char::from(CHARSET.get(idx).copied().unwrap_or(b'A'))
        })
        .collect()
}

/// PKCE S256 challenge: `BASE64URL(SHA256(verifier))` without padding.
#[must_use]
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
