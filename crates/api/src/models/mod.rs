//! Domain models for the API.
//!
//! Row structs derive `sqlx::FromRow` and are serialized straight into JSON
//! responses; fields that must never leave the server (password hashes) live
//! in separate row types in [`crate::db`].

pub mod account;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod report;
pub mod session;

pub use account::{Account, Address, Admin};
pub use cart::{Cart, CartItem, Coupon, Offer, WishlistEntry};
pub use catalog::{Inventory, Product, ProductDetail, ProductView};
pub use order::{Invoice, Order, OrderItem, ReturnRequest};
pub use session::{CurrentSession, keys};
