//! JSON-over-HTTP commerce backend client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;
use url::Url;

use shopfront_core::{Cart, NewProduct, Principal, Product, ProductId, PurchaseReceipt};

use super::{BackendError, CommerceBackend};

/// Header identifying the caller for cart operations.
pub const PRINCIPAL_HEADER: &str = "X-Principal-Id";

/// Longest response body kept in error messages and logs.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct AddToCartRequest {
    product_id: ProductId,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for a remote commerce backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client rooted at `base_url`.
    ///
    /// Endpoint paths are resolved relative to `base_url`, so a base of
    /// `https://api.test/v1` reaches `https://api.test/v1/products`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpBackendInner { client, base_url }),
        })
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Send a request and decode a JSON response.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text);
            return Err(match status {
                StatusCode::NOT_FOUND => BackendError::NotFound(message),
                StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                    BackendError::Rejected(message)
                }
                _ => {
                    tracing::error!(
                        status = %status,
                        body = %message,
                        "Backend returned non-success status"
                    );
                    BackendError::Status {
                        status: status.as_u16(),
                        body: message,
                    }
                }
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&text),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }
}

#[async_trait]
impl CommerceBackend for HttpBackend {
    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn add_product(&self, product: NewProduct) -> Result<Product, BackendError> {
        let url = self.endpoint("products")?;
        self.execute(self.inner.client.post(url).json(&product))
            .await
    }

    #[instrument(skip(self))]
    async fn all_products(&self) -> Result<Vec<Product>, BackendError> {
        let url = self.endpoint("products")?;
        let products: Vec<Product> = self.execute(self.inner.client.get(url)).await?;
        tracing::debug!(count = products.len(), "Fetched products");
        Ok(products)
    }

    #[instrument(skip(self, principal), fields(principal = %principal))]
    async fn add_to_cart(
        &self,
        principal: &Principal,
        product_id: ProductId,
    ) -> Result<Cart, BackendError> {
        let url = self.endpoint("cart/items")?;
        let request = self
            .inner
            .client
            .post(url)
            .header(PRINCIPAL_HEADER, principal.as_str())
            .json(&AddToCartRequest { product_id });
        self.execute(request).await
    }

    #[instrument(skip(self, principal), fields(principal = %principal))]
    async fn current_cart(&self, principal: &Principal) -> Result<Cart, BackendError> {
        let url = self.endpoint("cart")?;
        let request = self
            .inner
            .client
            .get(url)
            .header(PRINCIPAL_HEADER, principal.as_str());
        self.execute(request).await
    }

    #[instrument(skip(self, principal), fields(principal = %principal))]
    async fn buy_current_cart(
        &self,
        principal: &Principal,
    ) -> Result<PurchaseReceipt, BackendError> {
        let url = self.endpoint("cart/purchase")?;
        let request = self
            .inner
            .client
            .post(url)
            .header(PRINCIPAL_HEADER, principal.as_str());
        self.execute(request).await
    }
}

/// Prefer the backend's `{"error": ".."}` message over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| truncate(body), |parsed| truncate(&parsed.error))
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
