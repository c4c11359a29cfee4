//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for the commerce domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod principal;
pub mod product;

pub use cart::{Cart, CartItem, PurchaseReceipt};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use principal::{Principal, PrincipalError};
pub use product::{NewProduct, Product, ProductError};
