//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendError, CommerceBackend, HttpBackend, MemoryBackend};
use crate::config::StorefrontConfig;
use crate::identity::{IdentityProvider, OidcIdentityProvider};
use crate::shell::Navigator;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: Arc<dyn CommerceBackend>,
    identity: Arc<dyn IdentityProvider>,
    navigator: Navigator,
}

impl AppState {
    /// Create a new application state from explicit parts.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        backend: Arc<dyn CommerceBackend>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                identity,
                navigator: Navigator::new(),
            }),
        }
    }

    /// Build the state the binary runs with.
    ///
    /// Uses the remote backend when `SHOPFRONT_BACKEND_URL` is configured and
    /// an in-memory backend otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend: Arc<dyn CommerceBackend> = match &config.backend.url {
            Some(url) => {
                tracing::info!(backend = %url, "Using remote commerce backend");
                Arc::new(HttpBackend::new(url.clone(), config.backend.timeout)?)
            }
            None => {
                tracing::warn!(
                    "SHOPFRONT_BACKEND_URL not set, using in-memory backend (data is lost on restart)"
                );
                Arc::new(MemoryBackend::new())
            }
        };
        let identity = Arc::new(OidcIdentityProvider::new(&config.identity));

        Ok(Self::new(config, backend, identity))
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the commerce backend.
    #[must_use]
    pub fn backend(&self) -> &dyn CommerceBackend {
        self.inner.backend.as_ref()
    }

    /// Get the identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the navigation generation tracker.
    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.inner.navigator
    }
}
