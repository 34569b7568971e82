//! Business logic services.
//!
//! Services borrow the pool (and any external client they need) for the
//! duration of one request and sequence repository calls. Every workflow that
//! writes more than one row runs in a single [`crate::db::UnitOfWork`].
//!
//! # Services
//!
//! - `account` - Profile and address management
//! - `admin` - User management, coupons, and offers
//! - `auth` - Password and SMS OTP authentication
//! - `cart` - Cart lines, coupons, and wishlist
//! - `catalog` - Ticket and apparel browsing and administration
//! - `checkout` - Cart-to-order conversion and payment verification
//! - `orders` - History, cancellation, returns, and refunds
//! - `reports` - Dashboard and sales reports
//! - `otp` - Twilio Verify client
//! - `razorpay` - Razorpay gateway client

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod orders;
pub mod otp;
pub mod razorpay;
pub mod reports;

pub use account::AccountService;
pub use admin::{AdminService, UserLookup};
pub use auth::{AuthError, AuthService};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use error::ServiceError;
pub use orders::OrderService;
pub use otp::{OtpClient, OtpError};
pub use razorpay::{GatewayError, RazorpayClient};
pub use reports::ReportService;
