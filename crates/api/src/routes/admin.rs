//! Admin endpoints: login, users, catalog, inventory, promotions, orders,
//! returns, and reports.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use festiv_core::{
    AccountId, AdminId, OrderId, OrderStatus, ProductCategory, ProductId, ReportPeriod, ReturnId,
    ReturnStatus, Role,
};

use super::auth::{OtpIssued, OtpRequest, OtpVerification, PasswordLogin};
use super::page;
use crate::error::{AppError, Result, set_sentry_user};
use crate::extract;
use crate::middleware::{RequireAdmin, set_current_session};
use crate::models::CurrentSession;
use crate::models::account::{Account, Admin};
use crate::models::cart::{Coupon, NewCoupon, NewOffer, Offer};
use crate::models::catalog::{NewProduct, Product, ProductChanges, ProductView, StockAdjustment};
use crate::models::order::{Order, OrderView, ReturnRequest};
use crate::models::report::{Dashboard, SalesReport};
use crate::services::auth::AdminInput;
use crate::services::orders::Refund;
use crate::services::{
    AdminService, AuthService, CatalogService, OrderService, ReportService, UserLookup,
};
use crate::state::AppState;

// =============================================================================
// Auth
// =============================================================================

#[instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    extract::Json(input): extract::Json<PasswordLogin>,
) -> Result<Json<Admin>> {
    let admin = AuthService::new(state.pool(), state.otp())
        .admin_login_with_password(&input.phone, &input.password)
        .await?;
    start_session(&session, &admin).await?;
    Ok(Json(admin))
}

#[instrument(skip(state, input))]
pub async fn start_login_otp(
    State(state): State<AppState>,
    extract::Json(input): extract::Json<OtpRequest>,
) -> Result<Json<OtpIssued>> {
    let key = AuthService::new(state.pool(), state.otp())
        .admin_start_login_otp(&input.phone)
        .await?;
    Ok(Json(OtpIssued { key }))
}

#[instrument(skip(state, session, input))]
pub async fn finish_login_otp(
    State(state): State<AppState>,
    session: Session,
    extract::Json(input): extract::Json<OtpVerification>,
) -> Result<Json<Admin>> {
    let admin = AuthService::new(state.pool(), state.otp())
        .admin_finish_login_otp(&input.key, &input.code)
        .await?;
    start_session(&session, &admin).await?;
    Ok(Json(admin))
}

/// Register another admin. The first admin comes from `festiv admin create`.
#[instrument(skip(state, input))]
pub async fn register(
    State(state): State<AppState>,
    RequireAdmin(admin_id): RequireAdmin,
    extract::Json(input): extract::Json<AdminInput>,
) -> Result<(StatusCode, Json<Admin>)> {
    let admin = AuthService::new(state.pool(), state.otp())
        .register_admin(&input)
        .await?;
    tracing::info!(registered_by = %admin_id, admin_id = %admin.id, "Admin registered");
    Ok((StatusCode::CREATED, Json(admin)))
}

async fn start_session(session: &Session, admin: &Admin) -> Result<()> {
    let current = CurrentSession {
        subject_id: admin.id.as_i32(),
        phone: admin.phone.clone(),
        role: Role::Admin,
    };
    set_current_session(session, &current).await?;
    set_sentry_user(&admin.id, Role::Admin);
    tracing::info!(admin_id = %admin.id, "Admin logged in");
    Ok(())
}

// =============================================================================
// Users and dashboard
// =============================================================================

/// `?page&limit&permission`.
#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub permission: Option<bool>,
}

/// `?id` or `?name`, with `?page&limit` for name searches.
#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub id: Option<AccountId>,
    pub name: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Dashboard>> {
    Ok(Json(ReportService::new(state.pool()).dashboard().await?))
}

pub async fn users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Query(query): extract::Query<UsersQuery>,
) -> Result<Json<Vec<Account>>> {
    let users = AdminService::new(state.pool())
        .users(query.permission, page(query.page, query.limit))
        .await?;
    Ok(Json(users))
}

pub async fn search_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Query(query): extract::Query<UserSearchQuery>,
) -> Result<Json<Vec<Account>>> {
    let lookup = match (query.id, query.name) {
        (Some(id), _) => UserLookup::Id(id),
        (None, Some(name)) => UserLookup::NamePrefix(name),
        (None, None) => return Err(AppError::BadRequest("pass id or name".to_owned())),
    };
    let users = AdminService::new(state.pool())
        .search_users(lookup, page(query.page, query.limit))
        .await?;
    Ok(Json(users))
}

/// Block an active user or unblock a blocked one.
pub async fn toggle_permission(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Path(id): extract::Path<AccountId>,
) -> Result<Json<Account>> {
    Ok(Json(AdminService::new(state.pool()).toggle_permission(id).await?))
}

// =============================================================================
// Catalog and inventory
// =============================================================================

/// Body of `PUT /admin/inventory`.
#[derive(Debug, Deserialize)]
pub struct InventoryChange {
    pub category: ProductCategory,
    pub product_id: ProductId,
    pub method: StockAdjustment,
    pub quantity: i32,
}

/// Stock after an adjustment.
#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub category: ProductCategory,
    pub product_id: ProductId,
    pub stock: i32,
}

pub async fn create_product(
    category: ProductCategory,
    state: AppState,
    admin_id: AdminId,
    new: NewProduct,
) -> Result<(StatusCode, Json<ProductView>)> {
    let product = CatalogService::new(state.pool())
        .create(category, admin_id, &new)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    category: ProductCategory,
    state: AppState,
    id: ProductId,
    changes: ProductChanges,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.pool())
        .update(category, id, &changes)
        .await?;
    Ok(Json(product))
}

/// Soft delete; calling it again restores the product.
pub async fn toggle_product(
    category: ProductCategory,
    state: AppState,
    id: ProductId,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.pool())
        .toggle_removed(category, id)
        .await?;
    Ok(Json(product))
}

pub async fn adjust_inventory(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Json(input): extract::Json<InventoryChange>,
) -> Result<Json<StockLevel>> {
    let stock = CatalogService::new(state.pool())
        .adjust_stock(input.category, input.product_id, input.method, input.quantity)
        .await?;
    Ok(Json(StockLevel {
        category: input.category,
        product_id: input.product_id,
        stock,
    }))
}

/// Product administration for one category, mounted at `/admin/tickets` or
/// `/admin/apparels`.
pub fn catalog_routes(category: ProductCategory) -> axum::Router<AppState> {
    use axum::routing::post;

    axum::Router::new()
        .route(
            "/",
            post(
                move |State(state): State<AppState>,
                      RequireAdmin(admin_id): RequireAdmin,
                      extract::Json(new): extract::Json<NewProduct>| {
                    create_product(category, state, admin_id, new)
                },
            ),
        )
        .route(
            "/{id}",
            axum::routing::put(
                move |State(state): State<AppState>,
                      _admin: RequireAdmin,
                      extract::Path(id): extract::Path<ProductId>,
                      extract::Json(changes): extract::Json<ProductChanges>| {
                    update_product(category, state, id, changes)
                },
            )
            .delete(
                move |State(state): State<AppState>,
                      _admin: RequireAdmin,
                      extract::Path(id): extract::Path<ProductId>| {
                    toggle_product(category, state, id)
                },
            ),
        )
}

// =============================================================================
// Promotions
// =============================================================================

pub async fn create_coupon(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Json(new): extract::Json<NewCoupon>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = AdminService::new(state.pool()).create_coupon(&new).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn create_offer(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Json(new): extract::Json<NewOffer>,
) -> Result<(StatusCode, Json<Offer>)> {
    let offer = AdminService::new(state.pool()).create_offer(&new).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

// =============================================================================
// Orders and returns
// =============================================================================

/// `?status&page&limit`.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Body of the order and return status endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusChange<S> {
    pub status: S,
}

pub async fn orders(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Query(query): extract::Query<OrdersQuery>,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderService::new(state.pool())
        .list_by_status(query.status, page(query.page, query.limit))
        .await?;
    Ok(Json(orders))
}

pub async fn set_order_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Path(order_id): extract::Path<OrderId>,
    extract::Json(input): extract::Json<StatusChange<OrderStatus>>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool())
        .set_status(order_id, input.status)
        .await?;
    Ok(Json(order))
}

pub async fn refund(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Path(order_id): extract::Path<OrderId>,
) -> Result<Json<Refund>> {
    Ok(Json(OrderService::new(state.pool()).refund(order_id).await?))
}

pub async fn review_return(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Path(return_id): extract::Path<ReturnId>,
    extract::Json(input): extract::Json<StatusChange<ReturnStatus>>,
) -> Result<Json<ReturnRequest>> {
    let request = OrderService::new(state.pool())
        .review_return(return_id, input.status)
        .await?;
    Ok(Json(request))
}

// =============================================================================
// Reports
// =============================================================================

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`, both inclusive.
#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

pub async fn sales_between(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Query(range): extract::Query<DateRange>,
) -> Result<Json<SalesReport>> {
    let report = ReportService::new(state.pool())
        .sales_between(&range.start, &range.end)
        .await?;
    Ok(Json(report))
}

pub async fn sales_for_period(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Path(period): extract::Path<ReportPeriod>,
) -> Result<Json<SalesReport>> {
    let report = ReportService::new(state.pool())
        .sales_for_period(period, None)
        .await?;
    Ok(Json(report))
}

pub async fn sales_for_period_and_category(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    extract::Path((period, category)): extract::Path<(ReportPeriod, ProductCategory)>,
) -> Result<Json<SalesReport>> {
    let report = ReportService::new(state.pool())
        .sales_for_period(period, Some(category))
        .await?;
    Ok(Json(report))
}
