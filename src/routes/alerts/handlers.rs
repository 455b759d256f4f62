use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::CurrentUser;
use crate::common::AppState;
use crate::error::AppResult;
use crate::services::alerts::{self, AlertView};

use super::types::HistoryQuery;

/// Open alerts (active and unacknowledged), newest first
#[utoipa::path(
    get,
    path = "/api/alerts/active",
    responses(
        (status = 200, description = "Open alerts", body = Vec<AlertView>),
    ),
    security(("api_key" = [])),
    tag = "alerts"
)]
pub async fn list_active(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<AlertView>>> {
    Ok(Json(alerts::list_active(&state.db, &user).await?))
}

/// Acknowledged or resolved alerts, newest first
#[utoipa::path(
    get,
    path = "/api/alerts/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Alert history", body = Vec<AlertView>),
    ),
    security(("api_key" = [])),
    tag = "alerts"
)]
pub async fn list_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<AlertView>>> {
    Ok(Json(alerts::list_history(&state.db, &user, query.limit).await?))
}

/// Acknowledge an alert
///
/// Unknown alerts and alerts on other users' sensors are ignored.
#[utoipa::path(
    post,
    path = "/api/alerts/{alert_id}/acknowledge",
    params(
        ("alert_id" = i32, Path, description = "Alert ID"),
    ),
    responses(
        (status = 204, description = "Alert acknowledged or ignored"),
    ),
    security(("api_key" = [])),
    tag = "alerts"
)]
pub async fn acknowledge(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(alert_id): Path<i32>,
) -> AppResult<StatusCode> {
    alerts::acknowledge(&state.db, &user, alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve an alert
#[utoipa::path(
    post,
    path = "/api/alerts/{alert_id}/resolve",
    params(
        ("alert_id" = i32, Path, description = "Alert ID"),
    ),
    responses(
        (status = 204, description = "Alert resolved or ignored"),
    ),
    security(("api_key" = [])),
    tag = "alerts"
)]
pub async fn resolve(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(alert_id): Path<i32>,
) -> AppResult<StatusCode> {
    alerts::resolve(&state.db, &user, alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
