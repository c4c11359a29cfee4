//! Commerce backend clients.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products and carts - NO local
//!   caching, every view re-fetches
//! - [`CommerceBackend`] is the seam route handlers depend on
//!   (`Arc<dyn CommerceBackend>` in [`AppState`](crate::state::AppState))
//! - [`HttpBackend`] talks JSON over HTTP to the remote service
//! - [`MemoryBackend`] keeps everything in process, for local runs and tests
//!
//! # Operations
//!
//! | Operation | HTTP |
//! |-----------|------|
//! | `add_product` | `POST /products` |
//! | `all_products` | `GET /products` |
//! | `add_to_cart` | `POST /cart/items` |
//! | `current_cart` | `GET /cart` |
//! | `buy_current_cart` | `POST /cart/purchase` |
//!
//! Cart operations act on behalf of a [`Principal`], sent as the
//! `X-Principal-Id` header.

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use thiserror::Error;

use shopfront_core::{Cart, NewProduct, Principal, Product, ProductId, PurchaseReceipt};

/// Errors that can occur when calling the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend refused the operation (e.g., buying an empty cart).
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Operations the storefront consumes from the commerce backend.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Create a product.
    async fn add_product(&self, product: NewProduct) -> Result<Product, BackendError>;

    /// Fetch the whole catalog, in backend order.
    async fn all_products(&self) -> Result<Vec<Product>, BackendError>;

    /// Add one unit of a product to the principal's cart.
    async fn add_to_cart(
        &self,
        principal: &Principal,
        product_id: ProductId,
    ) -> Result<Cart, BackendError>;

    /// Fetch the principal's cart.
    async fn current_cart(&self, principal: &Principal) -> Result<Cart, BackendError>;

    /// Purchase and clear the principal's cart.
    async fn buy_current_cart(&self, principal: &Principal)
    -> Result<PurchaseReceipt, BackendError>;
}
