//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready          - Probes
//!
//! # Auth
//! POST /auth/signup[/otp[/verify]]     - Shopper signup
//! POST /auth/login[/otp[/verify]]      - Shopper login
//! POST /auth/logout                    - Logout (any role)
//!
//! # Shopper (requires user session)
//! /account, /account/addresses, /account/password
//! /tickets, /apparels                  - Browse, search, details
//! /cart, /cart/items, /cart/coupon     - Cart
//! /coupons, /offers, /wishlist         - Promotions and wishlist
//! /orders                              - Checkout, history, cancel, return
//!
//! # Admin (requires admin session, except login)
//! /admin/login[/otp[/verify]], /admin/register
//! /admin/dashboard, /admin/users
//! /admin/tickets, /admin/apparels, /admin/inventory
//! /admin/coupons, /admin/offers
//! /admin/orders, /admin/returns, /admin/reports
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use festiv_core::{Pagination, ProductCategory};

use crate::state::AppState;

/// Page request from optional `?page&limit`, with defaults and the cap applied.
pub(crate) fn page(page: Option<u32>, limit: Option<u32>) -> Pagination {
    Pagination::new(page.unwrap_or(1), limit.unwrap_or(Pagination::DEFAULT_LIMIT))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signup/otp", post(auth::start_signup_otp))
        .route("/signup/otp/verify", post(auth::finish_signup_otp))
        .route("/login", post(auth::login))
        .route("/login/otp", post(auth::start_login_otp))
        .route("/login/otp/verify", post(auth::finish_login_otp))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile).put(account::update_profile))
        .route("/addresses", post(account::add_address))
        .route("/addresses/{id}", delete(account::remove_address))
        .route("/password/otp", post(account::start_password_change))
        .route("/password", post(account::change_password))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", get(cart::items).post(cart::add_item))
        .route(
            "/items/{category}/{product_id}/increment",
            put(cart::increment),
        )
        .route("/items/{category}/{product_id}", delete(cart::remove_one))
        .route("/coupon/{code}", post(cart::apply_coupon))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::history).post(orders::place))
        .route("/payment/verify", post(orders::verify_payment))
        .route("/{id}/cancel", put(orders::cancel))
        .route("/{id}/return", post(orders::request_return))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(admin::login))
        .route("/login/otp", post(admin::start_login_otp))
        .route("/login/otp/verify", post(admin::finish_login_otp))
        .route("/register", post(admin::register))
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::users))
        .route("/users/search", get(admin::search_users))
        .route("/users/{id}/permission", post(admin::toggle_permission))
        .nest("/tickets", admin::catalog_routes(ProductCategory::Ticket))
        .nest("/apparels", admin::catalog_routes(ProductCategory::Apparel))
        .route("/inventory", put(admin::adjust_inventory))
        .route("/coupons", post(admin::create_coupon))
        .route("/offers", post(admin::create_offer))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", put(admin::set_order_status))
        .route("/orders/{id}/refund", post(admin::refund))
        .route("/returns/{id}", put(admin::review_return))
        .route("/reports/sales", get(admin::sales_between))
        .route("/reports/sales/{period}", get(admin::sales_for_period))
        .route(
            "/reports/sales/{period}/{category}",
            get(admin::sales_for_period_and_category),
        )
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/tickets", catalog::routes(ProductCategory::Ticket))
        .nest("/apparels", catalog::routes(ProductCategory::Apparel))
        .nest("/cart", cart_routes())
        .route("/coupons", get(cart::coupons))
        .route("/offers", get(cart::offers))
        .route("/wishlist", get(cart::wishlist))
        .route(
            "/wishlist/{category}/{product_id}",
            post(cart::add_to_wishlist).delete(cart::remove_from_wishlist),
        )
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}
