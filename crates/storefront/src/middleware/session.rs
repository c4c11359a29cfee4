//! Login handshake session.
//!
//! The OAuth `state` and PKCE verifier have to survive the round trip to the
//! identity provider. They live in a short-lived, in-memory `tower-sessions`
//! session under its own cookie; the login itself is never stored here (see
//! [`crate::session`]).
//!
//! Handshakes that are never completed are reclaimed by [`HandshakeStore`]:
//! records expire after the handshake timeout and the store is bounded.

use std::fmt;

use async_trait::async_trait;
use moka::future::Cache;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::{Duration, OffsetDateTime};
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Handshake session cookie name.
pub const HANDSHAKE_COOKIE_NAME: &str = "shopfront_handshake";

/// Handshake expiry in seconds (10 minutes of inactivity).
const HANDSHAKE_EXPIRY_SECONDS: i64 = 10 * 60;

/// Maximum number of handshakes in flight.
const MAX_PENDING_HANDSHAKES: u64 = 100_000;

/// Session keys used during the login handshake.
pub mod keys {
    /// CSRF state sent to the identity provider.
    pub const OAUTH_STATE: &str = "oauth_state";
    /// PKCE code verifier.
    pub const PKCE_VERIFIER: &str = "pkce_verifier";
}

/// In-memory session store for login handshakes.
///
/// Records live in a `moka` cache with a time-to-live, so abandoned logins
/// drop out without a cleanup task.
#[derive(Clone)]
pub struct HandshakeStore {
    records: Cache<Id, Record>,
}

impl HandshakeStore {
    /// Create a store holding at most `max_handshakes` records for `ttl` each.
    #[must_use]
    pub fn new(max_handshakes: u64, ttl: std::time::Duration) -> Self {
        let records = Cache::builder()
            .max_capacity(max_handshakes)
            .time_to_live(ttl)
            .build();
        Self { records }
    }
}

impl Default for HandshakeStore {
    fn default() -> Self {
        Self::new(
            MAX_PENDING_HANDSHAKES,
            std::time::Duration::from_secs(HANDSHAKE_EXPIRY_SECONDS.unsigned_abs()),
        )
    }
}

impl fmt::Debug for HandshakeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeStore")
            .field("records", &self.records.entry_count())
            .finish()
    }
}

#[async_trait]
impl SessionStore for HandshakeStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .get(session_id)
            .await
            .filter(|record| record.expiry_date > now))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.invalidate(session_id).await;
        Ok(())
    }
}

/// Create the handshake session layer.
#[must_use]
pub fn create_handshake_layer(config: &StorefrontConfig) -> SessionManagerLayer<HandshakeStore> {
    SessionManagerLayer::new(HandshakeStore::default())
        .with_name(HANDSHAKE_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            HANDSHAKE_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/auth")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn record(expires_in: Duration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::new(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_create_load_delete() {
        let store = HandshakeStore::default();
        let mut handshake = record(Duration::minutes(10));
        store.create(&mut handshake).await.unwrap();

        let loaded = store.load(&handshake.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, handshake.id);

        store.delete(&handshake.id).await.unwrap();
        assert!(store.load(&handshake.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_is_not_loaded() {
        let store = HandshakeStore::default();
        let stale = record(Duration::seconds(-1));
        store.save(&stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_abandoned_handshakes_are_reclaimed() {
        let store = HandshakeStore::new(100, std::time::Duration::from_millis(50));
        for _ in 0..10 {
            store.create(&mut record(Duration::minutes(10))).await.unwrap();
        }
        store.records.run_pending_tasks().await;
        assert_eq!(store.records.entry_count(), 10);

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        store.records.run_pending_tasks().await;
        assert_eq!(store.records.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_store_is_bounded() {
        let store = HandshakeStore::new(5, std::time::Duration::from_secs(600));
        for _ in 0..50 {
            store.create(&mut record(Duration::minutes(10))).await.unwrap();
        }
        store.records.run_pending_tasks().await;
        assert!(store.records.entry_count() <= 5);
    }
}
