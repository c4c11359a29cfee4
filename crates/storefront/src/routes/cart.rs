//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Every render fetches the cart from the backend for the signed-in
//! principal; nothing is kept locally.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::{Cart, CartItem, ProductId};

use super::{ShellPage, open_shell, render, stamped};
use crate::error::{Result, add_breadcrumb};
use crate::session::SessionStore;
use crate::shell::{View, parse_shell};
use crate::state::AppState;

/// Shown in place of the lines when the cart cannot be fetched.
pub const CART_ERROR_MESSAGE: &str = "Could not load your cart. Please try again.";

/// The one message every failed purchase collapses to.
pub const PURCHASE_FAILED_MESSAGE: &str = "Purchase failed. Please try again.";

/// Shown when a cart action is attempted while signed out.
pub const SIGN_IN_REQUIRED_MESSAGE: &str = "Log in to use your cart.";

/// Shown when adding to the cart fails.
const ADD_FAILED_MESSAGE: &str = "Could not add to cart. Please try again.";

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
    pub image_url: String,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            price: item.price.display(),
            quantity: item.quantity,
            line_total: item
                .line_total()
                .map(|total| total.display())
                .unwrap_or_default(),
            image_url: item.image_url.clone(),
        }
    }
}

/// Cart region.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart.html")]
pub struct CartRegion {
    pub signed_in: bool,
    pub items: Vec<CartLineView>,
    pub subtotal: Option<String>,
    pub item_count: u32,
    pub error: Option<String>,
    /// Shell the buy action reports back to; empty outside a shell.
    pub shell_id: String,
}

impl CartRegion {
    /// Region for a signed-out visitor.
    #[must_use]
    pub fn signed_out(shell_id: &str) -> Self {
        Self {
            signed_in: false,
            items: Vec::new(),
            subtotal: None,
            item_count: 0,
            error: None,
            shell_id: shell_id.to_string(),
        }
    }

    /// Region showing the fetch error state.
    #[must_use]
    pub fn failed(shell_id: &str) -> Self {
        Self {
            signed_in: true,
            error: Some(CART_ERROR_MESSAGE.to_string()),
            ..Self::signed_out(shell_id)
        }
    }

    /// Region listing `cart` in the order received.
    #[must_use]
    pub fn from_cart(cart: &Cart, shell_id: &str) -> Self {
        Self {
            signed_in: true,
            items: cart.items.iter().map(CartLineView::from).collect(),
            subtotal: cart.subtotal().map(|price| price.display()),
            item_count: cart.total_quantity(),
            error: None,
            shell_id: shell_id.to_string(),
        }
    }
}

/// Fetch the signed-in principal's cart and build its region.
///
/// Signed-out visitors get the sign-in prompt without a backend call.
pub async fn cart_region(state: &AppState, store: &SessionStore, shell_id: &str) -> CartRegion {
    let Some(principal) = store.get() else {
        return CartRegion::signed_out(shell_id);
    };

    match state.backend().current_cart(principal).await {
        Ok(cart) => CartRegion::from_cart(&cart, shell_id),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch cart");
            CartRegion::failed(shell_id)
        }
    }
}

/// Notification slot content.
#[derive(Template, WebTemplate)]
#[template(path = "partials/notification.html")]
pub struct Notification {
    pub kind: &'static str,
    pub message: String,
    /// Swap out-of-band alongside another fragment.
    pub oob: bool,
}

impl Notification {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
            oob: false,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
            oob: false,
        }
    }

    #[must_use]
    pub const fn out_of_band(mut self) -> Self {
        self.oob = true;
        self
    }

    /// Respond with this notification alone, leaving the content region as is.
    fn only(self) -> Response {
        (
            AppendHeaders([("HX-Retarget", "#notification"), ("HX-Reswap", "outerHTML")]),
            self,
        )
            .into_response()
    }
}

/// Add-to-cart status fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/add_to_cart.html")]
pub struct AddToCartStatus {
    pub success: bool,
    pub message: String,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
}

/// Buy form data.
#[derive(Debug, Deserialize)]
pub struct BuyForm {
    pub shell: Option<String>,
}

/// Display the cart page.
#[instrument(skip_all)]
pub async fn page(State(state): State<AppState>, store: SessionStore) -> Result<Html<String>> {
    let (shell, _ticket) = open_shell(&state, &store, View::Cart).await;
    let content = render(&cart_region(&state, &store, &shell.shell_id).await)?;

    let page = ShellPage {
        shell,
        title: "Cart",
        content,
    };
    Ok(Html(render(&page)?))
}

/// Add one unit of a product to the cart (HTMX).
///
/// The backend increments the quantity when the product is already in the
/// cart. Returns a status fragment and triggers `cart-updated`.
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    store: SessionStore,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let Some(principal) = store.get() else {
        return AddToCartStatus {
            success: false,
            message: SIGN_IN_REQUIRED_MESSAGE.to_string(),
        }
        .into_response();
    };

    let Ok(product_id) = form.product_id.parse::<ProductId>() else {
        tracing::warn!("Add to cart with malformed product id");
        return AddToCartStatus {
            success: false,
            message: ADD_FAILED_MESSAGE.to_string(),
        }
        .into_response();
    };

    match state.backend().add_to_cart(principal, product_id).await {
        Ok(cart) => {
            let quantity = cart
                .items
                .iter()
                .find(|item| item.product_id == product_id)
                .map_or(1, |item| item.quantity);
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", &product_id.to_string())]),
            );

            (
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                AddToCartStatus {
                    success: true,
                    message: format!("Added to cart ({quantity} in cart)"),
                },
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add item to cart");
            AddToCartStatus {
                success: false,
                message: ADD_FAILED_MESSAGE.to_string(),
            }
            .into_response()
        }
    }
}

/// Buy the current cart (HTMX).
///
/// On success the region is rebuilt from a fresh cart fetch and the
/// notification is swapped out-of-band. On failure, or when a newer
/// navigation in the shell has started, only the notification is delivered,
/// so whatever the region shows stays on screen.
#[instrument(skip_all)]
pub async fn buy(
    State(state): State<AppState>,
    store: SessionStore,
    Form(form): Form<BuyForm>,
) -> Result<Response> {
    let shell = parse_shell(form.shell.as_deref());
    let ticket = state.navigator().begin(shell).await;

    let Some(principal) = store.get() else {
        return Ok(Notification::error(SIGN_IN_REQUIRED_MESSAGE).only());
    };

    let receipt = match state.backend().buy_current_cart(principal).await {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::error!(error = %e, "Purchase failed");
            return Ok(Notification::error(PURCHASE_FAILED_MESSAGE).only());
        }
    };

    tracing::info!(order_id = %receipt.order_id, items = receipt.item_count, "Cart purchased");
    let message = format!(
        "Thank you! Order {} placed: {} item(s), {}.",
        receipt.order_id,
        receipt.item_count,
        receipt.total.display()
    );

    if !state.navigator().is_current(&ticket).await {
        return Ok(Notification::success(message).only());
    }

    let shell_id = shell.map(|id| id.to_string()).unwrap_or_default();
    let region = render(&cart_region(&state, &store, &shell_id).await)?;

    // A navigation may have started while the cart was refetched
    if !state.navigator().is_current(&ticket).await {
        return Ok(Notification::success(message).only());
    }

    let notification = render(&Notification::success(message).out_of_band())?;
    Ok(stamped(&ticket, Html(format!("{region}{notification}"))))
}
