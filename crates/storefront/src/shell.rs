//! Navigation shell: views and stale-response suppression.
//!
//! Every full page load is a shell with its own [`ShellId`]. Each region
//! render inside a shell takes a [`ViewTicket`] before its backend call and
//! checks it afterwards; if a newer navigation started meanwhile, the result
//! is dropped and the handler answers `204 No Content` so HTMX leaves the
//! region alone. The last navigation started wins.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;

shopfront_core::define_id!(ShellId);

/// How long an idle shell keeps its generation counter.
const SHELL_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Maximum number of tracked shells.
///
/// Once full, the cache's admission policy may refuse a new shell outright.
/// A refused shell has no counter, so all of its responses count as current
/// and superseded responses in it are delivered instead of dropped. Size this
/// above the number of shells open within `SHELL_IDLE_TIMEOUT`.
pub const MAX_SHELLS: u64 = 10_000;

/// Response header carrying the generation of a current render.
pub const GENERATION_HEADER: &str = "x-view-generation";

/// A view the content region can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Catalog,
    Cart,
}

impl View {
    /// Path segment used in `/views/{view}` and in nav links.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Catalog => "products",
            Self::Cart => "cart",
        }
    }

    /// Full-page URL for the view.
    #[must_use]
    pub const fn page_path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Catalog => "/products",
            Self::Cart => "/cart",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown view name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view: {0}")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Self::Home),
            "products" => Ok(Self::Catalog),
            "cart" => Ok(Self::Cart),
            other => Err(UnknownView(other.to_string())),
        }
    }
}

/// Parse a shell id sent by the browser; blank or malformed means no shell.
#[must_use]
pub fn parse_shell(raw: Option<&str>) -> Option<ShellId> {
    raw.and_then(|value| value.parse().ok())
}

/// Claim on a region render, issued by [`Navigator::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTicket {
    shell: Option<ShellId>,
    generation: u64,
}

impl ViewTicket {
    /// Ticket for a request outside any shell (always current).
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            shell: None,
            generation: 0,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tracks the latest navigation generation of each shell.
///
/// Cheap to clone; clones share the same counters. An evicted or never
/// admitted shell has no counter, so its tickets count as current (see
/// [`MAX_SHELLS`]).
#[derive(Clone)]
pub struct Navigator {
    generations: Cache<ShellId, Arc<AtomicU64>>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(MAX_SHELLS, SHELL_IDLE_TIMEOUT)
    }

    /// Create a navigator with custom capacity and idle expiry.
    #[must_use]
    pub fn with_limits(max_shells: u64, idle_timeout: Duration) -> Self {
        let generations = Cache::builder()
            .max_capacity(max_shells)
            .time_to_idle(idle_timeout)
            .build();
        Self { generations }
    }

    /// Start a navigation in `shell`, superseding every earlier ticket there.
    pub async fn begin(&self, shell: Option<ShellId>) -> ViewTicket {
        let Some(shell_id) = shell else {
            return ViewTicket::detached();
        };

        let counter = self
            .generations
            .get_with(shell_id, async { Arc::new(AtomicU64::new(0)) })
            .await;
        let generation = counter.fetch_add(1, Ordering::SeqCst).saturating_add(1);

        tracing::debug!(shell = %shell_id, generation, "Navigation started");
        ViewTicket {
            shell: Some(shell_id),
            generation,
        }
    }

    /// Whether `ticket` is still the latest navigation of its shell.
    pub async fn is_current(&self, ticket: &ViewTicket) -> bool {
        let Some(shell_id) = ticket.shell else {
            return true;
        };

        self.generations
            .get(&shell_id)
            .await
            .is_none_or(|counter| counter.load(Ordering::SeqCst) == ticket.generation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_view_round_trip() {
        for view in [View::Home, View::Catalog, View::Cart] {
            assert_eq!(view.as_str().parse::<View>().unwrap(), view);
        }
        assert_eq!(View::Catalog.page_path(), "/products");
        assert!("checkout".parse::<View>().is_err());
    }

    #[test]
    fn test_parse_shell() {
        let id = ShellId::generate();
        assert_eq!(parse_shell(Some(&id.to_string())), Some(id));
        assert_eq!(parse_shell(Some("")), None);
        assert_eq!(parse_shell(Some("not-a-shell")), None);
        assert_eq!(parse_shell(None), None);
    }

    #[tokio::test]
    async fn test_single_navigation_is_current() {
        let navigator = Navigator::new();
        let ticket = navigator.begin(Some(ShellId::generate())).await;
        assert_eq!(ticket.generation(), 1);
        assert!(navigator.is_current(&ticket).await);
    }

    #[tokio::test]
    async fn test_later_navigation_supersedes_earlier() {
        let navigator = Navigator::new();
        let shell = Some(ShellId::generate());

        // Catalog starts, then Cart starts before Catalog resolves
        let catalog = navigator.begin(shell).await;
        let cart = navigator.begin(shell).await;

        assert!(!navigator.is_current(&catalog).await);
        assert!(navigator.is_current(&cart).await);
    }

    #[tokio::test]
    async fn test_shells_are_independent() {
        let navigator = Navigator::new();
        let first = navigator.begin(Some(ShellId::generate())).await;
        let second = navigator.begin(Some(ShellId::generate())).await;

        assert!(navigator.is_current(&first).await);
        assert!(navigator.is_current(&second).await);
    }

    #[tokio::test]
    async fn test_detached_ticket_is_always_current() {
        let navigator = Navigator::new();
        let ticket = navigator.begin(None).await;
        assert_eq!(ticket, ViewTicket::detached());
        assert!(navigator.is_current(&ticket).await);
    }

    #[tokio::test]
    async fn test_unknown_shell_counts_as_current() {
        let navigator = Navigator::new();
        let other = Navigator::new();
        let ticket = other.begin(Some(ShellId::generate())).await;
        assert!(navigator.is_current(&ticket).await);
    }

    #[tokio::test]
    async fn test_untracked_shell_counts_as_current() {
        let navigator = Navigator::with_limits(0, SHELL_IDLE_TIMEOUT);
        let shell = Some(ShellId::generate());

        let first = navigator.begin(shell).await;
        navigator.begin(shell).await;
        navigator.generations.run_pending_tasks().await;

        // No room to track the shell, so nothing is suppressed
        assert_eq!(navigator.generations.entry_count(), 0);
        assert!(navigator.is_current(&first).await);
    }
}
