//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Full pages (navigation shell + one view)
//! GET  /                       - Home
//! GET  /products               - Catalog
//! GET  /cart                   - Cart
//!
//! # View regions (HTMX fragments for #content)
//! GET  /views/{view}?shell=ID  - home | products | cart; 204 when superseded
//!
//! # Products
//! GET  /products/new           - Add-product form
//! POST /products               - Create product
//!
//! # Cart (HTMX fragments)
//! POST /cart/add               - Add one unit (status fragment)
//! POST /cart/buy               - Buy current cart (region + notification)
//!
//! # Auth
//! GET  /auth/login             - Redirect to the identity provider
//! GET  /auth/callback          - Handle the provider redirect
//! POST /auth/logout            - Erase the login cookie
//! ```

pub mod auth;
pub mod cart;
pub mod home;
pub mod products;
pub mod views;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::config::StorefrontConfig;
use crate::error::{AppError, Result};
use crate::middleware::create_handshake_layer;
use crate::session::SessionStore;
use crate::shell::{GENERATION_HEADER, ShellId, View, ViewTicket};
use crate::state::AppState;

/// Navigation shell data shared by every full page.
#[derive(Debug, Clone)]
pub struct ShellContext {
    /// Signed-in principal, shown next to the logout control.
    pub principal: Option<String>,
    pub shell_id: String,
    /// Path segment of the active view.
    pub active: &'static str,
}

impl ShellContext {
    /// Nav links of this shell, inline.
    #[must_use]
    pub fn nav_links(&self, oob: bool) -> NavLinks {
        NavLinks::new(&self.shell_id, self.active, oob)
    }
}

/// Nav links with the active view highlighted.
///
/// Region responses carry an out-of-band copy so the highlight follows
/// in-shell navigation.
#[derive(Template, WebTemplate)]
#[template(path = "partials/nav_links.html")]
pub struct NavLinks {
    pub shell_id: String,
    pub active: &'static str,
    pub oob: bool,
}

impl NavLinks {
    #[must_use]
    pub fn new(shell_id: &str, active: &'static str, oob: bool) -> Self {
        Self {
            shell_id: shell_id.to_string(),
            active,
            oob,
        }
    }
}

/// Full page: the shell with one rendered region inside.
#[derive(Template, WebTemplate)]
#[template(path = "pages/shell.html")]
pub struct ShellPage {
    pub shell: ShellContext,
    pub title: &'static str,
    pub content: String,
}

/// Start a new shell for a full page load.
///
/// The returned ticket is the shell's first generation.
pub async fn open_shell(
    state: &AppState,
    store: &SessionStore,
    active: View,
) -> (ShellContext, ViewTicket) {
    let shell_id = ShellId::generate();
    let ticket = state.navigator().begin(Some(shell_id)).await;

    let shell = ShellContext {
        principal: store.get().map(ToString::to_string),
        shell_id: shell_id.to_string(),
        active: active.as_str(),
    };
    (shell, ticket)
}

/// Render a template to a string.
///
/// # Errors
///
/// Returns `AppError::Internal` if rendering fails.
pub fn render(template: &impl Template) -> Result<String> {
    template
        .render()
        .map_err(|e| AppError::Internal(format!("Template error: {e}")))
}

/// Deliver a region response unless a newer navigation superseded it.
///
/// Superseded responses become `204 No Content`, which HTMX does not swap.
pub async fn deliver(state: &AppState, ticket: &ViewTicket, body: impl IntoResponse) -> Response {
    if !state.navigator().is_current(ticket).await {
        tracing::debug!(generation = ticket.generation(), "Dropping superseded view response");
        return StatusCode::NO_CONTENT.into_response();
    }

    stamped(ticket, body)
}

/// Attach the ticket's generation to a region response already known to be current.
pub fn stamped(ticket: &ViewTicket, body: impl IntoResponse) -> Response {
    (
        [(GENERATION_HEADER, ticket.generation().to_string())],
        body,
    )
        .into_response()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::page).post(products::create))
        .route("/new", get(products::new_page))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::page))
        .route("/add", post(cart::add))
        .route("/buy", post(cart::buy))
}

/// Create all routes for the storefront.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/", get(home::page))
        .route("/views/{view}", get(views::region))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        // Only the login handshake needs server-side session state
        .nest("/auth", auth_routes().layer(create_handshake_layer(config)))
}
