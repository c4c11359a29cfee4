//! View region handler for in-shell navigation.

use axum::{
    extract::{Path, Query, State},
    response::{Html, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::{NavLinks, cart, deliver, home::HomeRegion, products, render};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::session::SessionStore;
use crate::shell::{View, parse_shell};
use crate::state::AppState;

/// View region query parameters.
#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    /// Shell the navigation belongs to.
    pub shell: Option<String>,
}

/// Render one view's region for the content area.
///
/// Takes a navigation ticket before any backend call. If another navigation
/// in the same shell starts before this one resolves, the response is
/// `204 No Content` and the region is left alone. A delivered region carries
/// the nav links out-of-band with the new view highlighted.
///
/// # Route
///
/// `GET /views/{view}?shell=ID`
#[instrument(skip_all, fields(view = %view))]
pub async fn region(
    State(state): State<AppState>,
    store: SessionStore,
    Path(view): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let view: View = view
        .parse()
        .map_err(|e: crate::shell::UnknownView| AppError::NotFound(e.to_string()))?;

    let shell = parse_shell(query.shell.as_deref());
    let ticket = state.navigator().begin(shell).await;
    add_breadcrumb("navigation", "Opened view", Some(&[("view", view.as_str())]));

    let shell_id = shell.map(|id| id.to_string()).unwrap_or_default();
    let region = match view {
        View::Home => render(&HomeRegion::new(&store))?,
        View::Catalog => render(&products::catalog_region(&state, &store).await)?,
        View::Cart => render(&cart::cart_region(&state, &store, &shell_id).await)?,
    };
    let nav = render(&NavLinks::new(&shell_id, view.as_str(), true))?;

    Ok(deliver(&state, &ticket, Html(format!("{region}{nav}"))).await)
}
