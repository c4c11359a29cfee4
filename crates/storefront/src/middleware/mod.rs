//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Handshake session (OAuth state, `/auth` only)

pub mod request_id;
pub mod session;

pub use request_id::request_id_middleware;
pub use session::create_handshake_layer;
