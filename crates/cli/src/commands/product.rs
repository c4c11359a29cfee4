//! Catalog commands.

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;
use url::Url;

use shopfront_core::{CurrencyCode, NewProduct, Price};
use shopfront_storefront::backend::{BackendError, CommerceBackend, HttpBackend};

/// Request timeout for CLI calls.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from catalog commands.
#[derive(Debug, Error)]
pub enum ProductCommandError {
    #[error("SHOPFRONT_BACKEND_URL not set")]
    MissingBackendUrl,

    #[error("SHOPFRONT_BACKEND_URL is not a valid URL: {0}")]
    InvalidBackendUrl(#[from] url::ParseError),

    #[error("invalid product: {0}")]
    Invalid(#[from] shopfront_core::ProductError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Product fields as given on the command line.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub description: String,
    pub image_url: String,
    pub featured: bool,
}

impl From<ProductInput> for NewProduct {
    fn from(input: ProductInput) -> Self {
        Self {
            name: input.name.trim().to_string(),
            price: Price::new(input.price, input.currency),
            description: input.description,
            image_url: input.image_url,
            featured: input.featured,
        }
    }
}

/// Connect to the backend named by `SHOPFRONT_BACKEND_URL`.
fn connect() -> Result<HttpBackend, ProductCommandError> {
    dotenvy::dotenv().ok();

    let raw = std::env::var("SHOPFRONT_BACKEND_URL")
        .map_err(|_| ProductCommandError::MissingBackendUrl)?;
    let url = Url::parse(&raw)?;
    Ok(HttpBackend::new(url, TIMEOUT)?)
}

/// Create a product.
///
/// # Errors
///
/// Returns an error if the input is invalid or the backend call fails.
pub async fn add(input: ProductInput) -> Result<(), ProductCommandError> {
    let product = NewProduct::from(input);
    product.validate()?;

    let backend = connect()?;
    let created = backend.add_product(product).await?;

    info!("Added product {} with id {}", created.name, created.id);
    Ok(())
}

/// List every product in backend order.
///
/// # Errors
///
/// Returns an error if the backend call fails.
pub async fn list() -> Result<(), ProductCommandError> {
    let backend = connect()?;
    let products = backend.all_products().await?;

    info!(count = products.len(), "Catalog");
    for product in &products {
        info!(
            id = %product.id,
            price = %product.price,
            featured = product.featured,
            "{}",
            product.name
        );
    }
    Ok(())
}
