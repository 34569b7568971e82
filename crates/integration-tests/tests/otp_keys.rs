//! Expiry of outstanding one-time-password keys.
//!
//! These tests require a running `PostgreSQL` database named by
//! `FESTIV_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p festiv-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use festiv_api::db::otp;
use festiv_api::services::otp::{OTP_TTL_MINUTES, expiry_cutoff};
use festiv_integration_tests::fixtures::migrated_pool;

async fn insert_key(pool: &PgPool, phone: &str, age: Duration) -> String {
    let key = Uuid::new_v4().to_string();
    sqlx::query(r"INSERT INTO festiv.otp_key (key, phone, created_at) VALUES ($1, $2, $3)")
        .bind(&key)
        .bind(phone)
        .bind(Utc::now() - age)
        .execute(pool)
        .await
        .unwrap();
    key
}

async fn insert_signup(pool: &PgPool, phone: &str, age: Duration) {
    sqlx::query(
        r"
        INSERT INTO festiv.pending_signup
            (phone, first_name, last_name, email, password_hash, created_at)
        VALUES ($1, 'Pending', 'Shopper', $2, 'unused', $3)
        ",
    )
    .bind(phone)
    .bind(format!("{phone}@example.com"))
    .bind(Utc::now() - age)
    .execute(pool)
    .await
    .unwrap();
}

async fn key_exists(pool: &PgPool, key: &str) -> bool {
    sqlx::query_scalar(r"SELECT EXISTS (SELECT 1 FROM festiv.otp_key WHERE key = $1)")
        .bind(key)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn signup_exists(pool: &PgPool, phone: &str) -> bool {
    sqlx::query_scalar(r"SELECT EXISTS (SELECT 1 FROM festiv.pending_signup WHERE phone = $1)")
        .bind(phone)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn phone() -> String {
    format!("8{:09}", Uuid::new_v4().as_u128() % 1_000_000_000)
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_purge_drops_only_expired_keys_and_signups() {
    let pool = migrated_pool().await;
    let stale_phone = phone();
    let fresh_phone = phone();
    let expired = Duration::minutes(OTP_TTL_MINUTES + 5);

    let stale_key = insert_key(&pool, &stale_phone, expired).await;
    let fresh_key = insert_key(&pool, &fresh_phone, Duration::minutes(1)).await;
    insert_signup(&pool, &stale_phone, expired).await;
    insert_signup(&pool, &fresh_phone, Duration::minutes(1)).await;

    let removed = otp::purge_expired(&pool, expiry_cutoff(Utc::now()))
        .await
        .unwrap();

    assert!(removed >= 2);
    assert!(!key_exists(&pool, &stale_key).await);
    assert!(!signup_exists(&pool, &stale_phone).await);
    assert!(key_exists(&pool, &fresh_key).await);
    assert!(signup_exists(&pool, &fresh_phone).await);
}
