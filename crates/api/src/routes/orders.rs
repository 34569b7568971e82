//! Checkout, payment verification, history, cancellation, and returns.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use festiv_core::{AddressId, OrderId, Pagination, PaymentMethod};

use crate::error::Result;
use crate::extract;
use crate::middleware::RequireUser;
use crate::models::order::{Invoice, Order, OrderView, Placement, ReturnRequest};
use crate::services::{CheckoutService, OrderService};
use crate::state::AppState;

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct PlaceOrder {
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
}

/// Values the checkout widget hands back after payment.
#[derive(Debug, Deserialize)]
pub struct PaymentVerification {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// A settled order and its invoice.
#[derive(Debug, Serialize)]
pub struct PaidOrder {
    pub order: Order,
    pub invoice: Invoice,
}

/// Body of `POST /orders/{id}/return`.
#[derive(Debug, Deserialize)]
pub struct ReturnReason {
    pub reason: String,
}

pub async fn place(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Json(input): extract::Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Placement>)> {
    let placement = CheckoutService::new(state.pool(), state.razorpay())
        .place_order(account_id, input.address_id, input.payment_method)
        .await?;
    Ok((StatusCode::CREATED, Json(placement)))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Json(input): extract::Json<PaymentVerification>,
) -> Result<Json<PaidOrder>> {
    let (order, invoice) = CheckoutService::new(state.pool(), state.razorpay())
        .verify_payment(
            account_id,
            &input.gateway_order_id,
            &input.payment_id,
            &input.signature,
        )
        .await?;
    Ok(Json(PaidOrder { order, invoice }))
}

pub async fn history(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Query(page): extract::Query<Pagination>,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderService::new(state.pool())
        .history(account_id, page.normalized())
        .await?;
    Ok(Json(orders))
}

pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path(order_id): extract::Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool())
        .cancel(account_id, order_id)
        .await?;
    Ok(Json(order))
}

pub async fn request_return(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    extract::Path(order_id): extract::Path<OrderId>,
    extract::Json(input): extract::Json<ReturnReason>,
) -> Result<(StatusCode, Json<ReturnRequest>)> {
    let request = OrderService::new(state.pool())
        .request_return(account_id, order_id, &input.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}
