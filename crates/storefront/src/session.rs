//! Login session persisted in the `principalId` cookie.
//!
//! The cookie value is the bare principal string, `Path=/`, with an expiry
//! `ttl_days` from login. [`SessionToken`] is the only place cookie strings
//! are encoded or decoded; [`SessionStore`] is the per-request accessor that
//! handlers receive as an extractor and hand back as a response part.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn login_done(mut store: SessionStore) -> impl IntoResponse {
//!     store.set(principal, DEFAULT_TTL_DAYS);
//!     (store, Redirect::to("/"))
//! }
//! ```

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, HeaderValue, header, request::Parts};
use axum::response::{IntoResponseParts, ResponseParts};
use tower_sessions::cookie::time::{Duration, OffsetDateTime};
use tower_sessions::cookie::{Cookie, SameSite};

use shopfront_core::Principal;

use crate::state::AppState;

/// Name of the login cookie.
pub const PRINCIPAL_COOKIE: &str = "principalId";

/// Default login cookie lifetime in days.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Longest login cookie lifetime in days.
pub const MAX_TTL_DAYS: i64 = 365;

/// A principal together with the expiry it was issued with.
///
/// Tokens decoded from a request carry no expiry: the browser drops expired
/// cookies and never sends their attributes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    principal: Principal,
    expires_at: Option<OffsetDateTime>,
}

impl SessionToken {
    /// Issue a token that expires `ttl_days` after `now`.
    ///
    /// `ttl_days` is clamped to `0..=MAX_TTL_DAYS`.
    #[must_use]
    pub fn issue(principal: Principal, ttl_days: i64, now: OffsetDateTime) -> Self {
        let ttl = Duration::days(ttl_days.clamp(0, MAX_TTL_DAYS));
        Self {
            principal,
            expires_at: Some(now.saturating_add(ttl)),
        }
    }

    /// Find the login cookie among `Cookie` header values.
    ///
    /// Each header may hold any number of `name=value` pairs separated by
    /// `; `. Unrelated cookies and malformed pairs are skipped; a login cookie
    /// whose value is not a valid principal counts as absent.
    pub fn decode<'a>(cookie_headers: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let value = cookie_headers
            .into_iter()
            .flat_map(Cookie::split_parse)
            .flatten()
            .find(|cookie| cookie.name() == PRINCIPAL_COOKIE)?;

        match Principal::parse(value.value()) {
            Ok(principal) => Some(Self {
                principal,
                expires_at: None,
            }),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed {PRINCIPAL_COOKIE} cookie");
                None
            }
        }
    }

    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    /// Whether the token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Build the `Set-Cookie` representation of this token.
    #[must_use]
    pub fn to_cookie(&self, secure: bool, now: OffsetDateTime) -> Cookie<'static> {
        let mut builder = Cookie::build((PRINCIPAL_COOKIE, self.principal.as_str().to_owned()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure);

        if let Some(expires_at) = self.expires_at {
            let max_age = if expires_at > now {
                expires_at - now
            } else {
                Duration::ZERO
            };
            builder = builder.expires(expires_at).max_age(max_age);
        }

        builder.build()
    }

    /// Build a cookie that makes the browser drop the login cookie now.
    #[must_use]
    pub fn removal(secure: bool) -> Cookie<'static> {
        let mut cookie = Cookie::build((PRINCIPAL_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .build();
        cookie.make_removal();
        cookie
    }
}

/// Per-request view of the login session.
///
/// Reads the login cookie when extracted; `set` and `erase` queue a
/// `Set-Cookie` that is written when the store is returned as part of the
/// response. Returning the store is required for changes to reach the browser.
#[derive(Debug, Clone)]
pub struct SessionStore {
    token: Option<SessionToken>,
    pending: Option<Cookie<'static>>,
    secure: bool,
}

impl SessionStore {
    /// Read the login cookie from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, secure: bool) -> Self {
        let token = SessionToken::decode(
            headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );

        Self {
            token,
            pending: None,
            secure,
        }
    }

    /// A store with no login cookie.
    #[must_use]
    pub const fn anonymous(secure: bool) -> Self {
        Self {
            token: None,
            pending: None,
            secure,
        }
    }

    /// The current principal, or `None` when logged out or expired.
    #[must_use]
    pub fn get(&self) -> Option<&Principal> {
        self.token
            .as_ref()
            .filter(|token| !token.is_expired_at(OffsetDateTime::now_utc()))
            .map(SessionToken::principal)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.get().is_some()
    }

    /// Log in as `principal` for `ttl_days` days.
    pub fn set(&mut self, principal: Principal, ttl_days: i64) {
        let now = OffsetDateTime::now_utc();
        let token = SessionToken::issue(principal, ttl_days, now);
        self.pending = Some(token.to_cookie(self.secure, now));
        self.token = Some(token);
    }

    /// Log out immediately.
    pub fn erase(&mut self) {
        self.token = None;
        self.pending = Some(SessionToken::removal(self.secure));
    }

    /// The `Set-Cookie` queued by `set` or `erase`, if any.
    #[must_use]
    pub const fn pending_cookie(&self) -> Option<&Cookie<'static>> {
        self.pending.as_ref()
    }
}

impl FromRequestParts<AppState> for SessionStore {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, state.config().is_secure()))
    }
}

impl IntoResponseParts for SessionStore {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(cookie) = self.pending {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    res.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!(error = %e, "Login cookie is not a valid header value"),
            }
        }
        Ok(res)
    }
}
