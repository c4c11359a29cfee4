//! Shopfront Core - Shared types library.
//!
//! This crate provides common types used across all Shopfront components:
//! - `storefront` - Server-rendered shop front-end (catalog, cart, login)
//! - `cli` - Command-line tools for catalog management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients. The commerce backend owns products and carts; these types are the
//! shapes exchanged with it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, principals, products and carts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
