//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::Html};
use tracing::instrument;

use super::{ShellPage, open_shell, render};
use crate::error::Result;
use crate::session::SessionStore;
use crate::shell::View;
use crate::state::AppState;

/// Home region.
#[derive(Template, WebTemplate)]
#[template(path = "partials/home.html")]
pub struct HomeRegion {
    pub principal: Option<String>,
}

impl HomeRegion {
    #[must_use]
    pub fn new(store: &SessionStore) -> Self {
        Self {
            principal: store.get().map(ToString::to_string),
        }
    }
}

/// Display the home page.
#[instrument(skip_all)]
pub async fn page(State(state): State<AppState>, store: SessionStore) -> Result<Html<String>> {
    let (shell, _ticket) = open_shell(&state, &store, View::Home).await;
    let content = render(&HomeRegion::new(&store))?;

    let page = ShellPage {
        shell,
        title: "Home",
        content,
    };
    Ok(Html(render(&page)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::Principal;

    use super::*;
    use crate::routes::{NavLinks, ShellContext};

    #[test]
    fn test_home_region_greets_principal() {
        let mut store = SessionStore::anonymous(false);
        store.set(Principal::parse("abc123").unwrap(), 7);

        let html = HomeRegion::new(&store).render().unwrap();
        assert!(html.contains("Hello, abc123"));
    }

    #[test]
    fn test_shell_shows_login_control_when_signed_out() {
        let store = SessionStore::anonymous(false);
        let page = ShellPage {
            shell: ShellContext {
                principal: None,
                shell_id: "s-1".to_string(),
                active: "home",
            },
            title: "Home",
            content: HomeRegion::new(&store).render().unwrap(),
        };

        let html = page.render().unwrap();
        assert!(html.contains(r#"id="login""#));
        assert!(!html.contains(r#"id="logout""#));
        assert!(html.contains("/views/products?shell=s-1"));
        assert!(html.contains(r#"<main id="content">"#));
    }

    #[test]
    fn test_shell_shows_logout_control_when_signed_in() {
        let page = ShellPage {
            shell: ShellContext {
                principal: Some("abc123".to_string()),
                shell_id: "s-2".to_string(),
                active: "cart",
            },
            title: "Cart",
            content: String::new(),
        };

        let html = page.render().unwrap();
        assert!(html.contains(r#"id="logout""#));
        assert!(html.contains("Signed in as abc123"));
        assert!(!html.contains(r#"id="login""#));
    }

    #[test]
    fn test_nav_highlights_active_view() {
        let shell = ShellContext {
            principal: None,
            shell_id: "s-3".to_string(),
            active: "products",
        };
        let html = shell.nav_links(false).render().unwrap();
        assert!(html.contains(r#"href="/products" class="active""#));
        assert_eq!(html.matches(r#"class="active""#).count(), 1);
        assert!(!html.contains("hx-swap-oob"));

        let html = NavLinks::new("s-3", "cart", true).render().unwrap();
        assert!(html.contains(r#"<span id="nav-links" hx-swap-oob="true">"#));
        assert!(html.contains(r#"href="/cart" class="active""#));
    }
}
