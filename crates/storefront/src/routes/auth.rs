//! Authentication route handlers.
//!
//! Handles the OAuth flow with the external identity provider:
//! - Login: Redirects to the provider's authorization page
//! - Callback: Exchanges the code for a principal and sets the login cookie
//! - Logout: Erases the login cookie and redirects to the provider's logout

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::identity::{AuthorizationRequest, generate_random_string, pkce_challenge};
use crate::middleware::session::keys;
use crate::session::SessionStore;
use crate::state::AppState;

/// Length of the CSRF state parameter.
const STATE_LENGTH: usize = 32;

/// Length of the PKCE code verifier (43 to 128 allowed).
const VERIFIER_LENGTH: usize = 64;

/// Query parameters from the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Initiate login with the identity provider.
///
/// Generates the state and PKCE verifier, stores them in the handshake
/// session, and redirects to the provider's authorization page.
///
/// # Route
///
/// `GET /auth/login`
#[instrument(skip_all)]
pub async fn login(State(state): State<AppState>, session: Session) -> Response {
    let oauth_state = generate_random_string(STATE_LENGTH);
    let verifier = generate_random_string(VERIFIER_LENGTH);

    if let Err(e) = session.insert(keys::OAUTH_STATE, &oauth_state).await {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        return Redirect::to("/").into_response();
    }
    if let Err(e) = session.insert(keys::PKCE_VERIFIER, &verifier).await {
        tracing::error!(error = %e, "Failed to store PKCE verifier in session");
        return Redirect::to("/").into_response();
    }

    let redirect_uri = state.config().callback_url();
    let code_challenge = pkce_challenge(&verifier);
    let auth_url = state.identity().authorization_url(&AuthorizationRequest {
        redirect_uri: &redirect_uri,
        state: &oauth_state,
        code_challenge: &code_challenge,
    });

    Redirect::to(&auth_url).into_response()
}

/// Handle the provider callback.
///
/// Every failure is logged and lands on the home page still logged out.
///
/// # Route
///
/// `GET /auth/callback`
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    mut store: SessionStore,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let stored_state: Option<String> = session.get(keys::OAUTH_STATE).await.ok().flatten();
    let verifier: Option<String> = session.get(keys::PKCE_VERIFIER).await.ok().flatten();

    // One-time use
    let _ = session.remove::<String>(keys::OAUTH_STATE).await;
    let _ = session.remove::<String>(keys::PKCE_VERIFIER).await;

    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(error = %error, description = %description, "Identity provider returned an error");
        return Redirect::to("/").into_response();
    }

    let Some(code) = query.code else {
        tracing::warn!("Login callback missing code");
        return Redirect::to("/").into_response();
    };

    let Some(returned_state) = query.state else {
        tracing::warn!("Login callback missing state");
        return Redirect::to("/").into_response();
    };

    if stored_state.as_ref() != Some(&returned_state) {
        tracing::warn!("Login callback state mismatch");
        return Redirect::to("/").into_response();
    }

    let Some(verifier) = verifier else {
        tracing::warn!("Login callback without PKCE verifier");
        return Redirect::to("/").into_response();
    };

    let redirect_uri = state.config().callback_url();
    let principal = match state
        .identity()
        .exchange_code(&code, &redirect_uri, &verifier)
        .await
    {
        Ok(principal) => principal,
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange authorization code");
            return Redirect::to("/").into_response();
        }
    };

    set_sentry_user(&principal);
    tracing::info!(principal = %principal, "Customer signed in");
    store.set(principal, state.config().session_ttl_days);

    (store, Redirect::to("/")).into_response()
}

/// Log out.
///
/// Erases the login cookie first, whatever happens next, then redirects to
/// the provider's logout endpoint when it has one.
///
/// # Route
///
/// `POST /auth/logout`
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, mut store: SessionStore) -> Response {
    store.erase();
    clear_sentry_user();

    let post_logout_uri = format!("{}/", state.config().base_url);
    let target = state
        .identity()
        .logout_url(&post_logout_uri)
        .unwrap_or_else(|| "/".to_string());

    (store, Redirect::to(&target)).into_response()
}
