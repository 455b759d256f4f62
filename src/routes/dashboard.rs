use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::CurrentUser;
use crate::common::AppState;
use crate::error::AppResult;
use crate::services::dashboard::{self, DashboardSummary, RecentReading};

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentQuery {
    /// Maximum number of readings (default: 10)
    pub limit: Option<u64>,
}

/// Parcel, sensor and open alert counts for the caller
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard counts", body = DashboardSummary),
        (status = 401, description = "Missing or invalid API key"),
    ),
    security(("api_key" = [])),
    tag = "dashboard"
)]
pub async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<DashboardSummary>> {
    Ok(Json(dashboard::summary(&state.db, &user).await?))
}

/// Latest readings across the caller's sensors
#[utoipa::path(
    get,
    path = "/api/dashboard/recent-readings",
    params(RecentQuery),
    responses(
        (status = 200, description = "Recent readings, newest first", body = Vec<RecentReading>),
    ),
    security(("api_key" = [])),
    tag = "dashboard"
)]
pub async fn recent_readings(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<Vec<RecentReading>>> {
    Ok(Json(
        dashboard::recent_readings(&state.db, &user, query.limit).await?,
    ))
}
