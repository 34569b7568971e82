//! Festiv Core - Shared domain library.
//!
//! This crate provides the types and business rules used across the Festiv
//! components:
//! - `api` - REST backend for the ticket and apparel marketplace
//! - `cli` - Command-line tools for migrations and admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Everything here can be unit tested
//! without a running database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, contact details, and status enums
//! - [`pricing`] - Cart aggregates, coupon math, and checkout totals
//! - [`lifecycle`] - Order and return state machines
//! - [`pagination`] - Page/limit query handling

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod lifecycle;
pub mod pagination;
pub mod pricing;
pub mod types;

pub use lifecycle::TransitionError;
pub use pagination::Pagination;
pub use pricing::PricingError;
pub use types::*;
