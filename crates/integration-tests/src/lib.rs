//! Integration tests for Shopfront.
//!
//! Each test starts the storefront router on an ephemeral port, backed by an
//! in-memory commerce backend and a fake identity provider, and drives it
//! with a cookie-aware `reqwest` client, the way a browser would.
//!
//! # Test Categories
//!
//! - `storefront_session` - login, logout, login cookie
//! - `storefront_catalog` - catalog view and product creation
//! - `storefront_cart` - cart view, add to cart, purchase
//! - `storefront_navigation` - superseded view responses

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::sync::Notify;
use url::Url;

use shopfront_core::{
    Cart, CurrencyCode, NewProduct, Price, Principal, Product, ProductId, PurchaseReceipt,
};
use shopfront_storefront::backend::{BackendError, CommerceBackend, MemoryBackend};
use shopfront_storefront::config::{BackendConfig, IdentityConfig, StorefrontConfig};
use shopfront_storefront::identity::{AuthorizationRequest, IdentityError, IdentityProvider};
use shopfront_storefront::state::AppState;

/// Identity provider that approves every login without leaving the host.
///
/// The authorization URL points straight back at the callback, carrying the
/// requested principal as the authorization code.
pub struct FakeIdentity {
    principal: String,
    logout_url: Option<String>,
}

impl FakeIdentity {
    #[must_use]
    pub fn new(principal: &str) -> Self {
        Self {
            principal: principal.to_string(),
            logout_url: None,
        }
    }

    /// Send logouts to `url` at the provider.
    #[must_use]
    pub fn with_logout_url(mut self, url: &str) -> Self {
        self.logout_url = Some(url.to_string());
        self
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> String {
        format!(
            "{}?code={}&state={}",
            request.redirect_uri, self.principal, request.state
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
        _code_verifier: &str,
    ) -> Result<Principal, IdentityError> {
        Ok(Principal::parse(code)?)
    }

    fn logout_url(&self, post_logout_redirect_uri: &str) -> Option<String> {
        self.logout_url
            .as_ref()
            .map(|url| format!("{url}?post_logout_redirect_uri={post_logout_redirect_uri}"))
    }
}

/// Backend wrapper whose catalog fetch or purchase can be made to fail.
#[derive(Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    fail_catalog: AtomicBool,
    fail_purchase: AtomicBool,
}

impl FlakyBackend {
    pub fn fail_catalog(&self, fail: bool) {
        self.fail_catalog.store(fail, Ordering::SeqCst);
    }

    pub fn fail_purchase(&self, fail: bool) {
        self.fail_purchase.store(fail, Ordering::SeqCst);
    }
}

fn unavailable() -> BackendError {
    BackendError::Status {
        status: 503,
        body: "maintenance".to_string(),
    }
}

#[async_trait]
impl CommerceBackend for FlakyBackend {
    async fn add_product(&self, product: NewProduct) -> Result<Product, BackendError> {
        self.inner.add_product(product).await
    }

    async fn all_products(&self) -> Result<Vec<Product>, BackendError> {
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.all_products().await
    }

    async fn add_to_cart(
        &self,
        principal: &Principal,
        product_id: ProductId,
    ) -> Result<Cart, BackendError> {
        self.inner.add_to_cart(principal, product_id).await
    }

    async fn current_cart(&self, principal: &Principal) -> Result<Cart, BackendError> {
        self.inner.current_cart(principal).await
    }

    async fn buy_current_cart(
        &self,
        principal: &Principal,
    ) -> Result<PurchaseReceipt, BackendError> {
        if self.fail_purchase.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.buy_current_cart(principal).await
    }
}

/// Backend wrapper that can hold the next catalog or cart fetch until released.
#[derive(Default)]
pub struct GatedBackend {
    inner: MemoryBackend,
    catalog_armed: AtomicBool,
    cart_armed: AtomicBool,
    entered: Notify,
    gate: Notify,
}

impl GatedBackend {
    /// Hold the next `all_products` call.
    pub fn arm(&self) {
        self.catalog_armed.store(true, Ordering::SeqCst);
    }

    /// Hold the next `current_cart` call.
    pub fn arm_cart(&self) {
        self.cart_armed.store(true, Ordering::SeqCst);
    }

    async fn hold_if(&self, armed: &AtomicBool) {
        if armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
    }

    /// Wait until the held call has started.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held call finish.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl CommerceBackend for GatedBackend {
    async fn add_product(&self, product: NewProduct) -> Result<Product, BackendError> {
        self.inner.add_product(product).await
    }

    async fn all_products(&self) -> Result<Vec<Product>, BackendError> {
        self.hold_if(&self.catalog_armed).await;
        self.inner.all_products().await
    }

    async fn add_to_cart(
        &self,
        principal: &Principal,
        product_id: ProductId,
    ) -> Result<Cart, BackendError> {
        self.inner.add_to_cart(principal, product_id).await
    }

    async fn current_cart(&self, principal: &Principal) -> Result<Cart, BackendError> {
        self.hold_if(&self.cart_armed).await;
        self.inner.current_cart(principal).await
    }

    async fn buy_current_cart(
        &self,
        principal: &Principal,
    ) -> Result<PurchaseReceipt, BackendError> {
        self.inner.buy_current_cart(principal).await
    }
}

/// A response reduced to what the tests look at.
#[derive(Debug)]
pub struct Page {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Page {
    /// Shell id of a full page.
    ///
    /// # Panics
    ///
    /// Panics if the page carries no shell.
    #[must_use]
    pub fn shell_id(&self) -> String {
        let start = self
            .body
            .find("data-shell=\"")
            .map(|i| i + "data-shell=\"".len())
            .expect("page has no shell");
        let rest = self.body.get(start..).expect("shell attribute");
        rest.split('"').next().expect("shell id").to_string()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A running storefront and a browser-like client for it.
pub struct TestContext {
    pub client: reqwest::Client,
    /// Same cookie jar as `client`, but redirects are returned, not followed.
    pub manual: reqwest::Client,
    pub base_url: String,
}

impl TestContext {
    /// Start a storefront where logins resolve to `principal`.
    pub async fn start(backend: Arc<dyn CommerceBackend>, principal: &str) -> Self {
        Self::start_with_identity(backend, Arc::new(FakeIdentity::new(principal))).await
    }

    /// Start a storefront with a custom identity provider.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be started.
    pub async fn start_with_identity(
        backend: Arc<dyn CommerceBackend>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        let base_url = format!("http://{addr}");

        let state = AppState::new(
            test_config(&base_url, addr.port()),
            backend,
            identity,
        );
        let app = shopfront_storefront::app(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server error");
        });

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("build client");
        let manual = reqwest::Client::builder()
            .cookie_provider(jar)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .expect("build client");

        Self {
            client,
            manual,
            base_url,
        }
    }

    /// Start a storefront over a fresh in-memory backend.
    pub async fn with_memory_backend(principal: &str) -> (Self, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let ctx = Self::start(backend.clone(), principal).await;
        (ctx, backend)
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a path, following redirects.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get(&self, path: &str) -> Page {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request");
        into_page(response).await
    }

    /// POST a form the way HTMX does.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_htmx(&self, path: &str, form: &[(&str, &str)]) -> Page {
        let response = self
            .client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("POST request");
        into_page(response).await
    }

    /// Log in through the identity provider round trip.
    pub async fn login(&self) -> Page {
        self.get("/auth/login").await
    }

    /// POST a plain form without following the redirect.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_unfollowed(&self, path: &str) -> Page {
        let response = self
            .manual
            .post(self.url(path))
            .send()
            .await
            .expect("POST request");
        into_page(response).await
    }

    /// Log out, following the redirect home.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn logout(&self) -> Page {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .send()
            .await
            .expect("logout request");
        into_page(response).await
    }
}

async fn into_page(response: reqwest::Response) -> Page {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.expect("response body");
    Page {
        status,
        headers,
        body,
    }
}

/// Storefront configuration pointing at nothing external.
///
/// # Panics
///
/// Panics on an invalid base URL.
#[must_use]
pub fn test_config(base_url: &str, port: u16) -> StorefrontConfig {
    let idp = |path: &str| Url::parse(&format!("https://id.invalid/{path}")).expect("valid URL");

    StorefrontConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port,
        base_url: base_url.to_string(),
        session_ttl_days: 7,
        backend: BackendConfig::default(),
        identity: IdentityConfig {
            authorize_url: idp("authorize"),
            token_url: idp("token"),
            userinfo_url: idp("userinfo"),
            logout_url: None,
            client_id: "shopfront-tests".to_string(),
            client_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A valid product with the given name and price in cents.
#[must_use]
pub fn new_product(name: &str, cents: i64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
        description: format!("{name} description"),
        image_url: format!("https://img.test/{name}.png"),
        featured: false,
    }
}
