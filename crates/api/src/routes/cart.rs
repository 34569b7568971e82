//! Cart, coupons, offers, and wishlist for the logged-in shopper.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use festiv_core::{ProductCategory, ProductId};

use crate::error::Result;
use crate::extract;
use crate::middleware::RequireUser;
use crate::models::cart::{CartItem, CartView, Coupon, Offer, WishlistEntry};
use crate::services::CartService;
use crate::state::AppState;

/// Body of `POST /cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub category: ProductCategory,
    pub product_id: ProductId,
    pub quantity: i32,
}

pub async fn show(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(state.pool()).view(account_id).await?))
}

pub async fn items(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
) -> Result<Json<Vec<CartItem>>> {
    Ok(Json(CartService::new(state.pool()).items(account_id).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Json(input): extract::Json<AddItem>,
) -> Result<(StatusCode, Json<CartView>)> {
    let cart = CartService::new(state.pool())
        .add_item(account_id, input.category, input.product_id, input.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

pub async fn increment(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path((category, product_id)): extract::Path<(ProductCategory, ProductId)>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .increment(account_id, category, product_id)
        .await?;
    Ok(Json(cart))
}

/// Take one unit off a line; the line goes away at zero.
pub async fn remove_one(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path((category, product_id)): extract::Path<(ProductCategory, ProductId)>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .remove_one(account_id, category, product_id)
        .await?;
    Ok(Json(cart))
}

pub async fn apply_coupon(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path(code): extract::Path<String>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .apply_coupon(account_id, &code)
        .await?;
    Ok(Json(cart))
}

pub async fn coupons(
    State(state): State<AppState>,
    _user: RequireUser,
) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(CartService::new(state.pool()).available_coupons().await?))
}

/// Offers the current cart total qualifies for, best first.
pub async fn offers(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
) -> Result<Json<Vec<Offer>>> {
    Ok(Json(CartService::new(state.pool()).offers(account_id).await?))
}

pub async fn wishlist(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
) -> Result<Json<Vec<WishlistEntry>>> {
    Ok(Json(CartService::new(state.pool()).wishlist(account_id).await?))
}

pub async fn add_to_wishlist(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path((category, product_id)): extract::Path<(ProductCategory, ProductId)>,
) -> Result<(StatusCode, Json<WishlistEntry>)> {
    let entry = CartService::new(state.pool())
        .add_to_wishlist(account_id, category, product_id)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path((category, product_id)): extract::Path<(ProductCategory, ProductId)>,
) -> Result<StatusCode> {
    CartService::new(state.pool())
        .remove_from_wishlist(account_id, category, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
