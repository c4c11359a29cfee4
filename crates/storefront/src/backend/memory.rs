//! In-process commerce backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use shopfront_core::{
    Cart, CartItem, NewProduct, OrderId, Principal, Product, ProductId, PurchaseReceipt,
};

use super::{BackendError, CommerceBackend};

/// Commerce backend that keeps the catalog and carts in memory.
///
/// Follows the same contract as the remote service: the catalog keeps
/// insertion order, adding a product already in the cart bumps its quantity,
/// and a purchase empties the cart. State is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    products: Vec<Product>,
    carts: HashMap<Principal, Vec<CartItem>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommerceBackend for MemoryBackend {
    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn add_product(&self, product: NewProduct) -> Result<Product, BackendError> {
        product
            .validate()
            .map_err(|e| BackendError::Rejected(e.to_string()))?;

        let created = Product {
            id: ProductId::generate(),
            name: product.name.trim().to_string(),
            price: product.price,
            description: product.description,
            image_url: product.image_url,
            average_rating: 0.0,
            featured: product.featured,
        };

        self.inner.write().await.products.push(created.clone());
        tracing::debug!(product_id = %created.id, "Product added");
        Ok(created)
    }

    async fn all_products(&self) -> Result<Vec<Product>, BackendError> {
        Ok(self.inner.read().await.products.clone())
    }

    #[instrument(skip(self, principal), fields(principal = %principal))]
    async fn add_to_cart(
        &self,
        principal: &Principal,
        product_id: ProductId,
    ) -> Result<Cart, BackendError> {
        let mut state = self.inner.write().await;

        let product = state
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("product {product_id}")))?;

        let items = state.carts.entry(principal.clone()).or_default();
        let existing = items.iter().position(|item| item.product_id == product_id);
        match existing.and_then(|index| items.get_mut(index)) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => items.push(CartItem {
                product_id,
                name: product.name,
                price: product.price,
                image_url: product.image_url,
                quantity: 1,
            }),
        }

        Ok(Cart {
            items: items.clone(),
        })
    }

    async fn current_cart(&self, principal: &Principal) -> Result<Cart, BackendError> {
        let items = self
            .inner
            .read()
            .await
            .carts
            .get(principal)
            .cloned()
            .unwrap_or_default();
        Ok(Cart { items })
    }

    #[instrument(skip(self, principal), fields(principal = %principal))]
    async fn buy_current_cart(
        &self,
        principal: &Principal,
    ) -> Result<PurchaseReceipt, BackendError> {
        let mut state = self.inner.write().await;

        let cart = Cart {
            items: state.carts.remove(principal).unwrap_or_default(),
        };
        if cart.is_empty() {
            return Err(BackendError::Rejected("cart is empty".to_string()));
        }

        let Some(total) = cart.subtotal() else {
            // Put the cart back untouched
            state.carts.insert(principal.clone(), cart.items);
            return Err(BackendError::Rejected(
                "cart total cannot be computed".to_string(),
            ));
        };

        let receipt = PurchaseReceipt {
            order_id: OrderId::generate(),
            item_count: cart.total_quantity(),
            total,
            purchased_at: chrono::Utc::now(),
        };
        tracing::info!(order_id = %receipt.order_id, items = receipt.item_count, "Cart purchased");
        Ok(receipt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;
    use shopfront_core::{CurrencyCode, Price};

    use super::*;

    fn new_product(name: &str, cents: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
            description: format!("{name} description"),
            image_url: format!("https://img.test/{name}.png"),
            featured: false,
        }
    }

    fn principal(raw: &str) -> Principal {
        Principal::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_add_product_then_catalog_contains_it_once() {
        let backend = MemoryBackend::new();
        let created = backend.add_product(new_product("Teapot", 2500)).await.unwrap();

        let products = backend.all_products().await.unwrap();
        let matching: Vec<_> = products.iter().filter(|p| p.id == created.id).collect();
        assert_eq!(matching.len(), 1);

        let product = matching[0];
        assert_eq!(product.name, "Teapot");
        assert_eq!(product.price.amount, Decimal::new(2500, 2));
        assert_eq!(product.description, "Teapot description");
        assert_eq!(product.image_url, "https://img.test/Teapot.png");
    }

    #[tokio::test]
    async fn test_catalog_keeps_insertion_order() {
        let backend = MemoryBackend::new();
        for name in ["c", "a", "b"] {
            backend.add_product(new_product(name, 100)).await.unwrap();
        }
        let names: Vec<_> = backend
            .all_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_same_name_products_get_distinct_ids() {
        let backend = MemoryBackend::new();
        let first = backend.add_product(new_product("Mug", 100)).await.unwrap();
        let second = backend.add_product(new_product("Mug", 200)).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(backend.all_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_product_rejects_invalid() {
        let backend = MemoryBackend::new();
        let err = backend.add_product(new_product("  ", 100)).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
        assert!(backend.all_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_to_cart_increments_quantity() {
        let backend = MemoryBackend::new();
        let tea = backend.add_product(new_product("Tea", 450)).await.unwrap();
        let cup = backend.add_product(new_product("Cup", 1000)).await.unwrap();
        let alice = principal("alice");

        backend.add_to_cart(&alice, tea.id).await.unwrap();
        backend.add_to_cart(&alice, cup.id).await.unwrap();
        let cart = backend.add_to_cart(&alice, tea.id).await.unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].product_id, tea.id);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.items[1].product_id, cup.id);
        assert_eq!(cart.items[1].quantity, 1);
    }

    #[tokio::test]
    async fn test_carts_are_per_principal() {
        let backend = MemoryBackend::new();
        let tea = backend.add_product(new_product("Tea", 450)).await.unwrap();

        backend.add_to_cart(&principal("alice"), tea.id).await.unwrap();
        assert!(backend.current_cart(&principal("bob")).await.unwrap().is_empty());
        assert_eq!(
            backend
                .current_cart(&principal("alice"))
                .await
                .unwrap()
                .total_quantity(),
            1
        );
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend
            .add_to_cart(&principal("alice"), ProductId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_buy_clears_cart_and_returns_receipt() {
        let backend = MemoryBackend::new();
        let tea = backend.add_product(new_product("Tea", 450)).await.unwrap();
        let alice = principal("alice");
        backend.add_to_cart(&alice, tea.id).await.unwrap();
        backend.add_to_cart(&alice, tea.id).await.unwrap();

        let receipt = backend.buy_current_cart(&alice).await.unwrap();
        assert_eq!(receipt.item_count, 2);
        assert_eq!(receipt.total.amount, Decimal::new(900, 2));
        assert!(backend.current_cart(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buy_empty_cart_is_rejected() {
        let backend = MemoryBackend::new();
        let err = backend
            .buy_current_cart(&principal("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(ref m) if m == "cart is empty"));
    }
}
