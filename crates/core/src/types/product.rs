//! Catalog product types.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Errors that can occur when validating a [`NewProduct`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The product name is empty or whitespace.
    #[error("product name cannot be empty")]
    EmptyName,
    /// The product name is too long.
    #[error("product name must be at most {max} characters")]
    NameTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The price is below zero.
    #[error("product price cannot be negative")]
    NegativePrice,
}

/// A product as returned by the commerce backend.
///
/// Products are owned by the backend; the storefront never mutates them and
/// never keeps them beyond a single render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    /// Average customer rating, 0 when unrated.
    #[serde(default)]
    pub average_rating: f32,
    #[serde(default)]
    pub featured: bool,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_url: String,
    pub featured: bool,
}

impl NewProduct {
    /// Maximum length of a product name.
    pub const MAX_NAME_LENGTH: usize = 200;

    /// Check the fields the backend relies on.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or too long, or the price is
    /// negative.
    pub fn validate(&self) -> Result<(), ProductError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProductError::EmptyName);
        }
        if name.chars().count() > Self::MAX_NAME_LENGTH {
            return Err(ProductError::NameTooLong {
                max: Self::MAX_NAME_LENGTH,
            });
        }
        if self.price.amount.is_sign_negative() && !self.price.amount.is_zero() {
            return Err(ProductError::NegativePrice);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::price::CurrencyCode;

    fn new_product(name: &str, cents: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
            description: "A thing".to_string(),
            image_url: "https://img.example/thing.png".to_string(),
            featured: false,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(new_product("Teapot", 1500).validate().is_ok());
        assert!(new_product("Free sample", 0).validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        assert_eq!(
            new_product("   ", 100).validate(),
            Err(ProductError::EmptyName)
        );
    }

    #[test]
    fn test_validate_long_name() {
        let name = "n".repeat(NewProduct::MAX_NAME_LENGTH + 1);
        assert!(matches!(
            new_product(&name, 100).validate(),
            Err(ProductError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_validate_negative_price() {
        assert_eq!(
            new_product("Refund", -1).validate(),
            Err(ProductError::NegativePrice)
        );
    }

    #[test]
    fn test_product_deserialize_defaults() {
        let id = ProductId::generate();
        let json = format!(r#"{{"id": "{id}", "name": "Mug", "price": {{"amount": "4.00"}}}}"#);
        let product: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(product.id, id);
        assert_eq!(product.name, "Mug");
        assert!(product.description.is_empty());
        assert!(product.average_rating.abs() < f32::EPSILON);
        assert!(!product.featured);
    }
}
