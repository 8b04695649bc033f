//! Connection initialization, degraded fallback and retry.

#![allow(clippy::unwrap_used)]

use axum::{body::Body, http::StatusCode};
use serde_json::json;
use skincare_admin::store::{CollectionPath, ConnectionStrategy, Order};
use skincare_admin_core::FieldValue;
use skincare_admin_integration_tests::{TestContext, request};

fn seed_users(ctx: &TestContext, count: usize) {
    for i in 0..count {
        ctx.seed(
            &format!("users/u{i:02}"),
            &[("email", FieldValue::from(format!("u{i}@example.com")))],
        );
    }
}

#[tokio::test]
async fn test_all_strategies_failing_uses_rest_path() {
    let ctx = TestContext::degraded();
    seed_users(&ctx, 30);

    let users = CollectionPath::parse("users").unwrap();
    let listed = ctx
        .data()
        .list(&users, 10, Order::newest_first("createdAt"))
        .await;

    assert!(listed.len() <= 10);
    assert!(!listed.is_empty());
    assert!(ctx.store.rest_calls() > 0);
    assert_eq!(ctx.store.native_calls(), 0);
    assert_eq!(ctx.connector.attempts(), ConnectionStrategy::ALL.to_vec());
}

#[tokio::test]
async fn test_native_connection_reported_with_strategy() {
    let ctx = TestContext::with_failing(&[ConnectionStrategy::Default]);

    let (status, body) = ctx.get_json("/api/connection").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"mode": "native", "strategy": "force_long_polling"})
    );
}

#[tokio::test]
async fn test_unreachable_then_retry_recovers() {
    let ctx = TestContext::degraded();
    ctx.store.set_rest_available(false);

    let (status, body) = ctx.get_json("/api/connection").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"mode": "unreachable"}));

    let (status, _) = ctx.get_json("/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    ctx.connector.recover();
    let (status, body) = ctx
        .send(request("POST", "/api/connection/retry", Body::empty(), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"mode": "native", "strategy": "default"}));

    let (status, _) = ctx.get_json("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_degraded_writes_are_rejected() {
    let ctx = TestContext::degraded();

    let (status, _) = ctx
        .send_json(
            "POST",
            "/api/products",
            &json!({"productName": "Toner", "brand": "Hada Labo", "category": "化粧水"}),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ctx.store.count("products"), 0);

    let (status, _) = ctx
        .send_json(
            "POST",
            "/api/users",
            &json!({"email": "a@example.com", "password": "secret1", "displayName": "A"}),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ctx.accounts.issued(), 0);
}

#[tokio::test]
async fn test_degraded_reads_still_serve() {
    let ctx = TestContext::degraded();
    seed_users(&ctx, 3);

    let (status, body) = ctx.get_json("/api/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    let (status, body) = ctx.get_json("/api/connection").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"mode": "degraded"}));
}
