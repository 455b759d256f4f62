use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::CurrentUser;
use crate::common::AppState;
use crate::error::{AppJson, AppResult};
use crate::services::ingest::{self, Reading};
use crate::services::sensors::{self, ReadingView, SensorUpdate, SensorView};

use super::types::{HistoryQuery, IngestRequest, IngestResponse};

/// Ingest a reading for a sensor
///
/// Stores the reading and opens an alert when the value leaves the sensor's
/// threshold band and no alert is already open for it.
#[utoipa::path(
    post,
    path = "/api/sensors/{sensor_id}/data",
    params(
        ("sensor_id" = i32, Path, description = "Sensor ID"),
    ),
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Reading stored", body = IngestResponse),
        (status = 400, description = "Invalid value or timestamp"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Sensor not found"),
    ),
    security(("api_key" = [])),
    tag = "sensors"
)]
pub async fn ingest_reading(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(sensor_id): Path<i32>,
    AppJson(body): AppJson<IngestRequest>,
) -> AppResult<Json<IngestResponse>> {
    let timestamp = body
        .timestamp
        .as_deref()
        .map(ingest::parse_timestamp)
        .transpose()?;

    let outcome = ingest::ingest(
        &state.db,
        &user,
        sensor_id,
        Reading {
            value: body.value,
            timestamp,
        },
    )
    .await?;

    Ok(Json(IngestResponse {
        status: "success".to_string(),
        alert_triggered: outcome.alert_triggered(),
    }))
}

/// Recent readings of a sensor, newest first
#[utoipa::path(
    get,
    path = "/api/sensors/{sensor_id}/data",
    params(
        ("sensor_id" = i32, Path, description = "Sensor ID"),
        HistoryQuery,
    ),
    responses(
        (status = 200, description = "Readings retrieved successfully", body = Vec<ReadingView>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Sensor not found"),
    ),
    security(("api_key" = [])),
    tag = "sensors"
)]
pub async fn sensor_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(sensor_id): Path<i32>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<ReadingView>>> {
    let readings = sensors::history(&state.db, &user, sensor_id, query.limit).await?;
    Ok(Json(readings))
}

/// Update a sensor's name, type, status or thresholds
#[utoipa::path(
    put,
    path = "/api/sensors/{sensor_id}",
    params(
        ("sensor_id" = i32, Path, description = "Sensor ID"),
    ),
    request_body = SensorUpdate,
    responses(
        (status = 200, description = "Sensor updated", body = SensorView),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Sensor not found"),
    ),
    security(("api_key" = [])),
    tag = "sensors"
)]
pub async fn update_sensor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(sensor_id): Path<i32>,
    AppJson(body): AppJson<SensorUpdate>,
) -> AppResult<Json<SensorView>> {
    let sensor = sensors::update(&state.db, &user, sensor_id, body).await?;
    Ok(Json(sensor))
}

/// Delete a sensor together with its readings and alerts
///
/// Unknown sensors are ignored.
#[utoipa::path(
    delete,
    path = "/api/sensors/{sensor_id}",
    params(
        ("sensor_id" = i32, Path, description = "Sensor ID"),
    ),
    responses(
        (status = 204, description = "Sensor deleted or absent"),
    ),
    security(("api_key" = [])),
    tag = "sensors"
)]
pub async fn delete_sensor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(sensor_id): Path<i32>,
) -> AppResult<StatusCode> {
    sensors::delete(&state.db, &user, sensor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
