//! Per-request account checks on an established session.
//!
//! These tests require a running `PostgreSQL` database named by
//! `FESTIV_TEST_DATABASE_URL`; sessions are stored in it.
//!
//! Run with: cargo test -p festiv-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use festiv_api::services::AdminService;
use festiv_integration_tests::fixtures::{
    SHOPPER_PASSWORD, app_with_pool, create_shopper, migrated_pool,
};
use festiv_integration_tests::json_body;

fn account_request(cookie: &str) -> Request<Body> {
    Request::builder()
        .uri("/account")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_blocking_ends_an_open_session() {
    let pool = migrated_pool().await;
    let shopper = create_shopper(&pool).await;
    let app = app_with_pool(pool.clone());

    let login = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "phone": shopper.phone, "password": SHOPPER_PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned();

    let response = app.clone().oneshot(account_request(&cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let blocked = AdminService::new(&pool)
        .toggle_permission(shopper.id)
        .await
        .unwrap();
    assert!(!blocked.permission);

    let response = app.oneshot(account_request(&cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "account is blocked");
}
