//! Integration tests for the cart view, add to cart and purchase.

use std::sync::Arc;

use shopfront_core::{Principal, ProductId};
use shopfront_integration_tests::{FlakyBackend, GatedBackend, TestContext, new_product};
use shopfront_storefront::backend::CommerceBackend;
use shopfront_storefront::routes::cart::{PURCHASE_FAILED_MESSAGE, SIGN_IN_REQUIRED_MESSAGE};

async fn seed(backend: &dyn CommerceBackend, name: &str, cents: i64) -> ProductId {
    backend
        .add_product(new_product(name, cents))
        .await
        .expect("seed product")
        .id
}

#[tokio::test]
async fn test_logged_out_cart_prompts_login() {
    let (ctx, _backend) = TestContext::with_memory_backend("abc123").await;

    let page = ctx.get("/cart").await;
    assert!(page.body.contains("sign-in-prompt"));
    assert!(!page.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_empty_cart_renders_empty_state() {
    let (ctx, _backend) = TestContext::with_memory_backend("abc123").await;
    ctx.login().await;

    let page = ctx.get("/views/cart").await;
    assert!(page.body.contains("Your cart is empty."));
    assert!(!page.body.contains(r#"class="cart-line""#));
}

#[tokio::test]
async fn test_add_to_cart_increments_quantity() {
    let (ctx, backend) = TestContext::with_memory_backend("abc123").await;
    let tea = seed(&*backend, "Tea", 450).await;
    let cup = seed(&*backend, "Cup", 1000).await;
    ctx.login().await;

    let tea_id = tea.to_string();
    let first = ctx.post_htmx("/cart/add", &[("product_id", &tea_id)]).await;
    assert!(first.body.contains("Added to cart (1 in cart)"));
    assert_eq!(first.header("hx-trigger"), Some("cart-updated"));

    ctx.post_htmx("/cart/add", &[("product_id", &cup.to_string())])
        .await;
    let again = ctx.post_htmx("/cart/add", &[("product_id", &tea_id)]).await;
    assert!(again.body.contains("Added to cart (2 in cart)"));

    let cart = ctx.get("/views/cart").await;
    assert_eq!(cart.body.matches(r#"class="cart-line""#).count(), 2);
    assert!(cart.body.find("Tea").expect("tea") < cart.body.find("Cup").expect("cup"));
    assert!(cart.body.contains("x 2"));
    assert!(cart.body.contains("3 item(s), subtotal $19.00"));
}

#[tokio::test]
async fn test_add_to_cart_signed_out_asks_for_login() {
    let (ctx, backend) = TestContext::with_memory_backend("abc123").await;
    let tea = seed(&*backend, "Tea", 450).await;

    let response = ctx
        .post_htmx("/cart/add", &[("product_id", &tea.to_string())])
        .await;
    assert!(response.body.contains(SIGN_IN_REQUIRED_MESSAGE));
}

#[tokio::test]
async fn test_buy_clears_cart_and_notifies() {
    let (ctx, backend) = TestContext::with_memory_backend("abc123").await;
    let tea = seed(&*backend, "Tea", 450).await;
    ctx.login().await;
    ctx.post_htmx("/cart/add", &[("product_id", &tea.to_string())])
        .await;

    let shell = ctx.get("/cart").await.shell_id();
    let response = ctx.post_htmx("/cart/buy", &[("shell", &shell)]).await;

    assert_eq!(response.status, 200);
    assert!(response.body.contains("Your cart is empty."));
    assert!(response.body.contains(r#"hx-swap-oob="true""#));
    assert!(response.body.contains("Thank you! Order"));
    assert!(response.header("x-view-generation").is_some());

    let principal = Principal::parse("abc123").expect("principal");
    let cart = backend.current_cart(&principal).await.expect("cart");
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_failed_buy_keeps_cart_and_shows_error() {
    let backend = Arc::new(FlakyBackend::default());
    let tea = seed(&*backend, "Tea", 450).await;
    let ctx = TestContext::start(backend.clone(), "abc123").await;
    ctx.login().await;
    ctx.post_htmx("/cart/add", &[("product_id", &tea.to_string())])
        .await;

    backend.fail_purchase(true);
    let page = ctx.get("/cart").await;
    assert_eq!(page.body.matches(r#"class="cart-line""#).count(), 1);

    let response = ctx
        .post_htmx("/cart/buy", &[("shell", &page.shell_id())])
        .await;

    // Only the notification slot is swapped; the rendered cart stays
    assert_eq!(response.header("hx-retarget"), Some("#notification"));
    assert!(response.body.contains(PURCHASE_FAILED_MESSAGE));
    assert!(!response.body.contains("cart-view"));

    let cart = ctx.get("/views/cart").await;
    assert_eq!(cart.body.matches(r#"class="cart-line""#).count(), 1);
}

#[tokio::test]
async fn test_buy_overtaken_by_navigation_still_notifies() {
    let backend = Arc::new(GatedBackend::default());
    let tea = seed(&*backend, "Tea", 450).await;
    let ctx = Arc::new(TestContext::start(backend.clone(), "abc123").await);
    ctx.login().await;
    ctx.post_htmx("/cart/add", &[("product_id", &tea.to_string())])
        .await;
    let shell = ctx.get("/cart").await.shell_id();

    // The purchase goes through, then the cart refetch stalls
    backend.arm_cart();
    let buy = {
        let ctx = Arc::clone(&ctx);
        let shell = shell.clone();
        tokio::spawn(async move { ctx.post_htmx("/cart/buy", &[("shell", &shell)]).await })
    };
    backend.wait_entered().await;

    let catalog = ctx.get(&format!("/views/products?shell={shell}")).await;
    assert!(catalog.body.contains("catalog-view"));

    backend.release();
    let response = buy.await.expect("buy request task");

    assert_eq!(response.status, 200);
    assert_eq!(response.header("hx-retarget"), Some("#notification"));
    assert!(response.body.contains("Thank you! Order"));
    assert!(!response.body.contains("cart-view"));
}
