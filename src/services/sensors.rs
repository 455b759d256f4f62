//! Sensor management and reading history.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::entity::sensor_readings;
use crate::entity::sensors::{self, SensorStatus};
use crate::error::{AppError, AppResult};
use crate::store;
use crate::store::sensors::SensorFields;

pub const DEFAULT_THRESHOLD_LOW: f64 = 0.0;
pub const DEFAULT_THRESHOLD_HIGH: f64 = 100.0;
pub const DEFAULT_HISTORY_LIMIT: u64 = 100;
pub const MAX_HISTORY_LIMIT: u64 = 1000;

fn sensor_not_found() -> AppError {
    AppError::NotFound("Sensor not found".to_string())
}

fn check_thresholds(low: f64, high: f64) -> AppResult<()> {
    if !low.is_finite() || !high.is_finite() {
        return Err(AppError::BadRequest(
            "thresholds must be finite numbers".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewSensor {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "sensor_type must not be empty"))]
    #[serde(alias = "type")]
    pub sensor_type: String,
    #[serde(default)]
    pub status: Option<SensorStatus>,
    #[serde(default)]
    pub threshold_low: Option<f64>,
    #[serde(default)]
    pub threshold_high: Option<f64>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct SensorUpdate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "sensor_type must not be empty"))]
    #[serde(alias = "type")]
    pub sensor_type: Option<String>,
    pub status: Option<SensorStatus>,
    pub threshold_low: Option<f64>,
    pub threshold_high: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SensorView {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub status: SensorStatus,
    pub parcel_id: i32,
    pub threshold_low: f64,
    pub threshold_high: f64,
    /// Most recent reading value, if any
    #[serde(rename = "last_reading")]
    pub last_value: Option<f64>,
    #[serde(rename = "last_update")]
    pub last_reading_time: Option<DateTime<Utc>>,
}

impl SensorView {
    fn new(sensor: sensors::Model, last_value: Option<f64>) -> Self {
        Self {
            id: sensor.id,
            name: sensor.name,
            sensor_type: sensor.sensor_type,
            status: sensor.status,
            parcel_id: sensor.parcel_id,
            threshold_low: sensor.threshold_low,
            threshold_high: sensor.threshold_high,
            last_value,
            last_reading_time: sensor.last_reading_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadingView {
    pub id: i32,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl From<sensor_readings::Model> for ReadingView {
    fn from(reading: sensor_readings::Model) -> Self {
        Self {
            id: reading.id,
            timestamp: reading.timestamp,
            value: reading.value,
        }
    }
}

async fn latest_value<C: ConnectionTrait>(db: &C, sensor_id: i32) -> AppResult<Option<f64>> {
    Ok(store::readings::latest(db, sensor_id, 1)
        .await?
        .first()
        .map(|r| r.value))
}

/// Sensors of an owned parcel, each with its latest reading value.
///
/// # Errors
///
/// `AppError::NotFound` when the parcel is unknown or owned by someone else.
pub async fn list_for_parcel<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    parcel_id: i32,
) -> AppResult<Vec<SensorView>> {
    let parcel = store::parcels::find_owned(db, user.id, parcel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Parcel not found".to_string()))?;

    let sensors = store::sensors::list_for_parcel(db, parcel.id).await?;
    let mut views = Vec::with_capacity(sensors.len());
    for sensor in sensors {
        let last_value = latest_value(db, sensor.id).await?;
        views.push(SensorView::new(sensor, last_value));
    }
    Ok(views)
}

/// # Errors
///
/// `AppError::NotFound` when the parcel is not owned; 400 for invalid fields.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    parcel_id: i32,
    input: NewSensor,
) -> AppResult<SensorView> {
    input.validate()?;
    let fields = SensorFields {
        name: input.name.trim().to_string(),
        sensor_type: input.sensor_type.trim().to_string(),
        status: input.status.unwrap_or(SensorStatus::Active),
        threshold_low: input.threshold_low.unwrap_or(DEFAULT_THRESHOLD_LOW),
        threshold_high: input.threshold_high.unwrap_or(DEFAULT_THRESHOLD_HIGH),
    };
    check_thresholds(fields.threshold_low, fields.threshold_high)?;

    let parcel = store::parcels::find_owned(db, user.id, parcel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Parcel not found".to_string()))?;

    let sensor = store::sensors::insert(db, parcel.id, fields).await?;
    tracing::info!(user_id = user.id, parcel_id, sensor_id = sensor.id, "sensor_created");
    Ok(SensorView::new(sensor, None))
}

/// # Errors
///
/// `AppError::NotFound` when the sensor is unknown or not owned.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    sensor_id: i32,
    input: SensorUpdate,
) -> AppResult<SensorView> {
    input.validate()?;
    let (sensor, _parcel) = store::sensors::find_owned(db, user.id, sensor_id)
        .await?
        .ok_or_else(sensor_not_found)?;

    let fields = SensorFields {
        name: input.name.map_or_else(|| sensor.name.clone(), |n| n.trim().to_string()),
        sensor_type: input
            .sensor_type
            .map_or_else(|| sensor.sensor_type.clone(), |t| t.trim().to_string()),
        status: input.status.unwrap_or(sensor.status),
        threshold_low: input.threshold_low.unwrap_or(sensor.threshold_low),
        threshold_high: input.threshold_high.unwrap_or(sensor.threshold_high),
    };
    check_thresholds(fields.threshold_low, fields.threshold_high)?;

    let updated = store::sensors::update(db, sensor, fields).await?;
    tracing::info!(user_id = user.id, sensor_id, "sensor_updated");
    let last_value = latest_value(db, sensor_id).await?;
    Ok(SensorView::new(updated, last_value))
}

/// Delete a sensor with its readings and alerts. Returns false when the
/// sensor is unknown or not owned.
pub async fn delete<C>(db: &C, user: &CurrentUser, sensor_id: i32) -> AppResult<bool>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    if store::sensors::find_owned(&txn, user.id, sensor_id).await?.is_none() {
        tracing::debug!(user_id = user.id, sensor_id, "sensor_delete_ignored");
        return Ok(false);
    }

    let ids = [sensor_id];
    store::alerts::delete_for_sensors(&txn, &ids).await?;
    store::readings::delete_for_sensors(&txn, &ids).await?;
    store::sensors::delete_many(&txn, &ids).await?;
    txn.commit().await?;

    tracing::info!(user_id = user.id, sensor_id, "sensor_deleted");
    Ok(true)
}

/// Clamp a requested history size to `1..=MAX_HISTORY_LIMIT`.
#[must_use]
pub fn history_limit(requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

/// Most recent readings of an owned sensor, newest first.
///
/// # Errors
///
/// `AppError::NotFound` when the sensor is unknown or not owned.
pub async fn history<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    sensor_id: i32,
    limit: Option<u64>,
) -> AppResult<Vec<ReadingView>> {
    let (sensor, _parcel) = store::sensors::find_owned(db, user.id, sensor_id)
        .await?
        .ok_or_else(sensor_not_found)?;

    let readings = store::readings::latest(db, sensor.id, history_limit(limit)).await?;
    Ok(readings.into_iter().map(ReadingView::from).collect())
}
