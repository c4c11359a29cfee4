//! Cart and purchase types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId};
use super::price::Price;

/// One line of a cart.
///
/// Adding a product that is already in the cart increments `quantity` on the
/// backend rather than adding a second line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image_url: String,
    pub quantity: u32,
}

impl CartItem {
    /// Price of the whole line. `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.times(self.quantity)
    }
}

/// The server-held cart of one principal, in the order the backend returned it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Sum of line totals.
    ///
    /// Returns `None` for an empty cart, when lines use different
    /// currencies, or when the sum overflows.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        let first = self.items.first()?;
        let currency = first.price.currency_code;

        self.items.iter().try_fold(Price::zero(currency), |acc, item| {
            acc.checked_add(&item.line_total()?)
        })
    }
}

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub order_id: OrderId,
    pub item_count: u32,
    pub total: Price,
    pub purchased_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::price::CurrencyCode;

    fn item(name: &str, cents: i64, quantity: u32, currency: CurrencyCode) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            name: name.to_string(),
            price: Price::new(Decimal::new(cents, 2), currency),
            image_url: String::new(),
            quantity,
        }
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::empty();
        assert!(cart.is_empty());
        assert_eq!(cart.total_quantity(), 0);
        assert!(cart.subtotal().is_none());
    }

    #[test]
    fn test_totals() {
        let cart = Cart {
            items: vec![
                item("Tea", 450, 2, CurrencyCode::USD),
                item("Cup", 1000, 1, CurrencyCode::USD),
            ],
        };
        assert_eq!(cart.total_quantity(), 3);
        let subtotal = cart.subtotal().unwrap();
        assert_eq!(subtotal.amount, Decimal::new(1900, 2));
        assert_eq!(subtotal.display(), "$19.00");
    }

    #[test]
    fn test_mixed_currency_has_no_subtotal() {
        let cart = Cart {
            items: vec![
                item("Tea", 450, 1, CurrencyCode::USD),
                item("Scone", 300, 1, CurrencyCode::GBP),
            ],
        };
        assert!(cart.subtotal().is_none());
    }

    #[test]
    fn test_overflowing_cart_has_no_subtotal() {
        let mut huge = item("Yacht", 0, 2, CurrencyCode::USD);
        huge.price.amount = Decimal::MAX;
        assert!(huge.line_total().is_none());

        let cart = Cart { items: vec![huge] };
        assert!(cart.subtotal().is_none());
    }

    #[test]
    fn test_cart_deserialize_missing_items() {
        let cart: Cart = serde_json::from_str("{}").unwrap();
        assert!(cart.is_empty());
    }
}
