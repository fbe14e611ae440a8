//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (accept or mint `x-request-id`)
//!
//! Authentication is not a layer: protected handlers take a
//! [`RequireAuth`] or [`RequireAdmin`] argument.

pub mod auth;
pub mod request_id;

pub use auth::{RequireAdmin, RequireAuth, bearer_token};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
