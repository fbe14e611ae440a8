//! Device Warranty Core - Shared domain types.
//!
//! This crate holds the validated value types used by every component of the
//! device warranty service:
//! - `server` - Account, token and device registration HTTP API
//! - `cli` - Migrations and administrative bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, email, phone, serial numbers and user roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
