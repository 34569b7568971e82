//! Router-level tests that need no database.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use tower::ServiceExt;

use festiv_integration_tests::{json_body, test_app};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

// =============================================================================
// Health checks and middleware
// =============================================================================

#[tokio::test]
async fn test_health_ok() {
    let response = test_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = test_app().oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-festiv-42")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-festiv-42");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let response = test_app().oneshot(get("/health")).await.unwrap();
    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = test_app().oneshot(get("/no-such-route")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Authentication gate
// =============================================================================

#[tokio::test]
async fn test_shopper_routes_require_login() {
    for uri in [
        "/account",
        "/cart",
        "/cart/items",
        "/coupons",
        "/offers",
        "/wishlist",
        "/orders",
        "/tickets",
        "/tickets/search?q=sun",
        "/apparels/1",
    ] {
        let response = test_app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = json_body(response).await;
        assert_eq!(body["error"], "login required", "{uri}");
    }
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let request = send_json(
        Method::POST,
        "/orders",
        r#"{"address_id": 1, "payment_method": "cod"}"#,
    );
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_login() {
    for uri in [
        "/admin/dashboard",
        "/admin/users",
        "/admin/orders?status=pending",
        "/admin/reports/sales?start=2024-01-01&end=2024-01-31",
        "/admin/reports/sales/week",
    ] {
        let response = test_app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_admin_mutations_require_login() {
    let request = send_json(
        Method::PUT,
        "/admin/inventory",
        r#"{"category": "ticket", "product_id": 1, "method": "increase", "quantity": 5}"#,
    );
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Input validation
// =============================================================================

#[tokio::test]
async fn test_malformed_login_body_is_bad_request() {
    let request = send_json(Method::POST, "/auth/login", r#"{"phone": "9876543210""#);
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_body_missing_field_is_bad_request() {
    let request = send_json(Method::POST, "/admin/login", r#"{"phone": "9876543210"}"#);
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
