use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::CurrentUser;
use crate::common::AppState;
use crate::error::{AppJson, AppResult};
use crate::services::parcels::{self, ParcelInput, ParcelView};
use crate::services::sensors::{self, NewSensor, SensorView};

/// List the caller's parcels
#[utoipa::path(
    get,
    path = "/api/parcels",
    responses(
        (status = 200, description = "Parcels retrieved successfully", body = Vec<ParcelView>),
        (status = 401, description = "Missing or invalid API key"),
    ),
    security(("api_key" = [])),
    tag = "parcels"
)]
pub async fn list_parcels(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<ParcelView>>> {
    Ok(Json(parcels::list(&state.db, &user).await?))
}

/// Create a parcel
#[utoipa::path(
    post,
    path = "/api/parcels",
    request_body = ParcelInput,
    responses(
        (status = 201, description = "Parcel created", body = ParcelView),
        (status = 400, description = "Invalid fields"),
    ),
    security(("api_key" = [])),
    tag = "parcels"
)]
pub async fn create_parcel(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(body): AppJson<ParcelInput>,
) -> AppResult<(StatusCode, Json<ParcelView>)> {
    let parcel = parcels::create(&state.db, &user, body).await?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

/// Update a parcel
#[utoipa::path(
    put,
    path = "/api/parcels/{parcel_id}",
    params(
        ("parcel_id" = i32, Path, description = "Parcel ID"),
    ),
    request_body = ParcelInput,
    responses(
        (status = 200, description = "Parcel updated", body = ParcelView),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Parcel not found"),
    ),
    security(("api_key" = [])),
    tag = "parcels"
)]
pub async fn update_parcel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(parcel_id): Path<i32>,
    AppJson(body): AppJson<ParcelInput>,
) -> AppResult<Json<ParcelView>> {
    Ok(Json(parcels::update(&state.db, &user, parcel_id, body).await?))
}

/// Delete a parcel with all of its sensors, readings and alerts
#[utoipa::path(
    delete,
    path = "/api/parcels/{parcel_id}",
    params(
        ("parcel_id" = i32, Path, description = "Parcel ID"),
    ),
    responses(
        (status = 204, description = "Parcel deleted or absent"),
    ),
    security(("api_key" = [])),
    tag = "parcels"
)]
pub async fn delete_parcel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(parcel_id): Path<i32>,
) -> AppResult<StatusCode> {
    parcels::delete(&state.db, &user, parcel_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the sensors of a parcel with their latest reading
#[utoipa::path(
    get,
    path = "/api/parcels/{parcel_id}/sensors",
    params(
        ("parcel_id" = i32, Path, description = "Parcel ID"),
    ),
    responses(
        (status = 200, description = "Sensors retrieved successfully", body = Vec<SensorView>),
        (status = 404, description = "Parcel not found or owned by another user"),
    ),
    security(("api_key" = [])),
    tag = "parcels"
)]
pub async fn list_parcel_sensors(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(parcel_id): Path<i32>,
) -> AppResult<Json<Vec<SensorView>>> {
    Ok(Json(sensors::list_for_parcel(&state.db, &user, parcel_id).await?))
}

/// Attach a new sensor to a parcel
#[utoipa::path(
    post,
    path = "/api/parcels/{parcel_id}/sensors",
    params(
        ("parcel_id" = i32, Path, description = "Parcel ID"),
    ),
    request_body = NewSensor,
    responses(
        (status = 201, description = "Sensor created", body = SensorView),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Parcel not found"),
    ),
    security(("api_key" = [])),
    tag = "parcels"
)]
pub async fn create_parcel_sensor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(parcel_id): Path<i32>,
    AppJson(body): AppJson<NewSensor>,
) -> AppResult<(StatusCode, Json<SensorView>)> {
    let sensor = sensors::create(&state.db, &user, parcel_id, body).await?;
    Ok((StatusCode::CREATED, Json(sensor)))
}
