//! Dashboard figures and CSV export.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use skincare_admin::services::analytics::dashboard_stats;
use skincare_admin_core::FieldValue;
use skincare_admin_integration_tests::TestContext;

#[tokio::test]
async fn test_dashboard_stats_use_time_boundaries() {
    let ctx = TestContext::new();
    let now = Utc::now();
    ctx.seed(
        "users/recent",
        &[
            ("createdAt", FieldValue::Timestamp(now - Duration::days(2))),
            ("lastLoginAt", FieldValue::Timestamp(now - Duration::hours(2))),
        ],
    );
    ctx.seed(
        "users/old",
        &[
            ("createdAt", FieldValue::Timestamp(now - Duration::days(90))),
            ("lastLoginAt", FieldValue::Timestamp(now - Duration::days(5))),
        ],
    );
    ctx.seed(
        "users/recent/skinAnalysis/a1",
        &[("timestamp", FieldValue::Timestamp(now - Duration::hours(1)))],
    );
    ctx.seed(
        "users/old/skinAnalysis/a2",
        &[("timestamp", FieldValue::Timestamp(now - Duration::days(10)))],
    );

    let stats = dashboard_stats(ctx.data(), now, 20).await;
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.daily_users, 1);
    assert_eq!(stats.monthly_users, 1);
    assert_eq!(stats.daily_analyses, 1);
    assert_eq!(stats.total_analyses, 2);

    let (status, body) = ctx.get_json("/api/dashboard/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], json!(2));
}

#[tokio::test]
async fn test_dashboard_stats_zero_when_unreachable() {
    let ctx = TestContext::degraded();
    ctx.store.set_rest_available(false);

    let (status, body) = ctx.get_json("/api/dashboard/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "totalUsers": 0,
            "dailyUsers": 0,
            "dailyAnalyses": 0,
            "monthlyUsers": 0,
            "totalAnalyses": 0
        })
    );
}

#[tokio::test]
async fn test_trends_and_popular_products() {
    let ctx = TestContext::new();
    for (id, score) in [("p1", 3.9), ("p2", 4.8), ("p3", 4.2)] {
        ctx.seed(
            &format!("products/{id}"),
            &[("評価スコア", FieldValue::Double(score))],
        );
    }

    let (status, trends) = ctx.get_json("/api/dashboard/trends").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends.as_array().map(Vec::len), Some(7));

    let (status, popular) = ctx.get_json("/api/dashboard/popular-products").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = popular
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["p2", "p3", "p1"]);
}

#[tokio::test]
async fn test_export_joins_latest_analysis_in_range() {
    let ctx = TestContext::new();
    let in_range = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
    let out_of_range = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    ctx.seed(
        "users/u1",
        &[
            ("displayName", FieldValue::from("Aiko")),
            ("email", FieldValue::from("aiko@example.com")),
            ("createdAt", FieldValue::Timestamp(in_range)),
            ("latestAnalysisId", FieldValue::from("a1")),
            ("latestAnalysisDate", FieldValue::Timestamp(in_range)),
        ],
    );
    ctx.seed(
        "users/u1/skinAnalysis/a1",
        &[
            ("skinAge", FieldValue::Integer(31)),
            ("timestamp", FieldValue::Timestamp(in_range)),
        ],
    );
    ctx.seed(
        "users/u2",
        &[
            ("createdAt", FieldValue::Timestamp(out_of_range)),
            ("latestAnalysisDate", FieldValue::Timestamp(out_of_range)),
        ],
    );

    let (status, body) = ctx
        .send_json(
            "POST",
            "/api/export",
            &json!({
                "start_date": "2024-03-01",
                "end_date": "2024-03-31",
                "items": ["user-info", "diagnostic-results", "chat-history"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let csv = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("user_id,display_name,email,created_at,provider,analysis_id"));
    assert!(lines[1].starts_with("u1,Aiko,aiko@example.com,2024-03-10T09:00:00Z,,a1,"));
    assert!(lines[1].contains(",31,"));
}

#[tokio::test]
async fn test_export_validation() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .send_json(
            "POST",
            "/api/export",
            &json!({"start_date": "2024-03-01", "end_date": "2024-03-31", "items": []}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .send_json(
            "POST",
            "/api/export",
            &json!({"start_date": "2024-04-01", "end_date": "2024-03-31", "items": ["user-info"]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(serde_json::from_slice::<Value>(&body).is_err());
    assert_eq!(ctx.store.native_calls(), 0);
}
