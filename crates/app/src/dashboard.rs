use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Datelike, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::warn;

use onboard_core::types::StoredRecord;

use crate::auth::authenticate;
use crate::problem::ProblemResponse;
use crate::router::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub this_month: usize,
    pub completed: usize,
}

/// GET /api/onboarding. Newest first, ordering is the store's contract.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<StoredRecord>>, ProblemResponse> {
    authenticate(&state, &headers)?;
    counter!("dashboard_requests_total", "endpoint" => "list").increment(1);

    let records = state.records.list_all().await.map_err(|err| {
        warn!(error = %err, "record listing failed");
        ProblemResponse::bad_gateway("record_store_failed", "could not load the records")
    })?;
    Ok(Json(records))
}

/// GET /api/onboarding/stats.
pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardStats>, ProblemResponse> {
    authenticate(&state, &headers)?;
    counter!("dashboard_requests_total", "endpoint" => "stats").increment(1);

    let records = state.records.list_all().await.map_err(|err| {
        warn!(error = %err, "record listing failed");
        ProblemResponse::bad_gateway("record_store_failed", "could not load the records")
    })?;
    Ok(Json(compute_stats(&records, state.now())))
}

/// Derives the dashboard counters from the full record list. "This month"
/// is the calendar month of `now` in UTC.
pub fn compute_stats(records: &[StoredRecord], now: DateTime<Utc>) -> DashboardStats {
    let this_month = records
        .iter()
        .filter(|stored| {
            stored.record.created_at.year() == now.year()
                && stored.record.created_at.month() == now.month()
        })
        .count();
    let completed = records
        .iter()
        .filter(|stored| stored.record.is_complete())
        .count();
    DashboardStats {
        total: records.len(),
        this_month,
        completed,
    }
}
