//! Dashboard counters, daily trends and popular products.
//!
//! All figures come from bounded lists filtered in process, so they are
//! approximate once a collection grows past the fetch limit.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use skincare_admin_core::{Product, SkinAnalysis, User};
use tracing::instrument;

use crate::data::{DataAccess, SKIN_ANALYSIS, USERS};
use crate::store::{CollectionPath, DocumentPath, Order};

/// Number of days covered by [`trends`].
pub const TREND_DAYS: i64 = 7;

/// Number of products returned by [`popular_products`] by default.
pub const POPULAR_PRODUCTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    /// Users whose last login is within the past 24 hours.
    pub daily_users: usize,
    /// Analyses taken within the past 24 hours.
    pub daily_analyses: usize,
    /// Users created within the past 30 days.
    pub monthly_users: usize,
    pub total_analyses: usize,
}

/// Per-day analysis count and rounded average scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub diagnostics: usize,
    pub skin_age: f64,
    pub pimples: f64,
    pub pores: f64,
    pub firmness: f64,
    pub redness: f64,
    pub sagging: f64,
}

/// Up to `limit` users plus up to `limit` analyses of each, fetched concurrently.
async fn users_with_analyses(data: &DataAccess, limit: usize) -> (Vec<User>, Vec<SkinAnalysis>) {
    let Ok(users_path) = CollectionPath::parse(USERS) else {
        return (Vec::new(), Vec::new());
    };
    let users: Vec<User> = data
        .list(&users_path, limit, Order::newest_first("createdAt"))
        .await
        .iter()
        .map(User::from_document)
        .collect();

    let users_path = &users_path;
    let per_user = join_all(users.iter().map(|user| async move {
        let Ok(path) = users_path
            .doc(&user.id)
            .and_then(|doc: DocumentPath| doc.collection(SKIN_ANALYSIS))
        else {
            return Vec::new();
        };
        data.list(&path, limit, Order::newest_first("timestamp"))
            .await
            .iter()
            .map(SkinAnalysis::from_document)
            .collect::<Vec<_>>()
    }))
    .await;

    (users, per_user.into_iter().flatten().collect())
}

/// Compute dashboard counters relative to `now`.
#[instrument(skip(data))]
pub async fn dashboard_stats(data: &DataAccess, now: DateTime<Utc>, limit: usize) -> DashboardStats {
    let (users, analyses) = users_with_analyses(data, limit).await;
    let yesterday = now - Duration::days(1);
    let last_month = now - Duration::days(30);

    let stats = DashboardStats {
        total_users: users.len(),
        daily_users: users
            .iter()
            .filter(|u| u.last_login_at.is_some_and(|at| at >= yesterday))
            .count(),
        daily_analyses: analyses
            .iter()
            .filter(|a| a.timestamp.is_some_and(|at| at >= yesterday))
            .count(),
        monthly_users: users
            .iter()
            .filter(|u| u.created_at.is_some_and(|at| at >= last_month))
            .count(),
        total_analyses: analyses.len(),
    };
    tracing::debug!(?stats, "Dashboard stats calculated");
    stats
}

#[allow(clippy::cast_precision_loss)] // Daily counts are tiny
fn rounded_mean(analyses: &[&SkinAnalysis], score: fn(&SkinAnalysis) -> f64) -> f64 {
    if analyses.is_empty() {
        return 0.0;
    }
    let total: f64 = analyses.iter().map(|a| score(a)).sum();
    (total / analyses.len() as f64).round()
}

/// Group analyses into the last [`TREND_DAYS`] UTC dates ending at `now`, oldest first.
#[must_use]
pub fn daily_trends(analyses: &[SkinAnalysis], now: DateTime<Utc>) -> Vec<DailyTrend> {
    let today = now.date_naive();
    (0..TREND_DAYS)
        .rev()
        .map(|offset| today - Duration::days(offset))
        .map(|date| {
            let day: Vec<&SkinAnalysis> = analyses
                .iter()
                .filter(|a| a.timestamp.is_some_and(|at| at.date_naive() == date))
                .collect();
            DailyTrend {
                date,
                diagnostics: day.len(),
                skin_age: rounded_mean(&day, |a| a.skin_age),
                pimples: rounded_mean(&day, |a| a.pimples),
                pores: rounded_mean(&day, |a| a.pores),
                firmness: rounded_mean(&day, |a| a.firmness),
                redness: rounded_mean(&day, |a| a.redness),
                sagging: rounded_mean(&day, |a| a.sagging),
            }
        })
        .collect()
}

/// Daily trends over the bounded analysis sample.
#[instrument(skip(data))]
pub async fn trends(data: &DataAccess, now: DateTime<Utc>, limit: usize) -> Vec<DailyTrend> {
    let (_, analyses) = users_with_analyses(data, limit).await;
    daily_trends(&analyses, now)
}

/// Highest-rated products from the bounded product list.
pub async fn popular_products(data: &DataAccess, limit: usize, top: usize) -> Vec<Product> {
    let mut products = data.list_products(limit).await;
    products.sort_by(|a, b| {
        b.evaluation_score
            .unwrap_or_default()
            .total_cmp(&a.evaluation_score.unwrap_or_default())
    });
    products.truncate(top);
    products
}
