//! Sensor reading ingestion and threshold alerting.

use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::auth::CurrentUser;
use crate::entity::alerts::{self, AlertLevel};
use crate::entity::{sensor_readings, sensors};
use crate::error::{AppError, AppResult};
use crate::store;
use crate::store::alerts::NewAlert;

/// Which threshold a reading crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breach {
    Low,
    High,
}

/// Classify a value against `[threshold_low, threshold_high]`.
///
/// The low bound is checked first, so with inverted thresholds a value
/// below `low` is reported as `Low` even if it is also above `high`.
#[must_use]
pub fn classify(value: f64, threshold_low: f64, threshold_high: f64) -> Option<Breach> {
    if value < threshold_low {
        Some(Breach::Low)
    } else if value > threshold_high {
        Some(Breach::High)
    } else {
        None
    }
}

#[must_use]
pub fn breach_message(sensor: &sensors::Model, breach: Breach, value: f64) -> String {
    match breach {
        Breach::Low => format!(
            "Low {} detected: {value:.2} (Threshold: {})",
            sensor.sensor_type, sensor.threshold_low
        ),
        Breach::High => format!(
            "High {} detected: {value:.2} (Threshold: {})",
            sensor.sensor_type, sensor.threshold_high
        ),
    }
}

/// Parse a device timestamp: RFC 3339 with offset, or a naive ISO-8601
/// date-time taken as UTC.
///
/// # Errors
///
/// `AppError::BadRequest` when neither form matches.
pub fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(AppError::BadRequest(format!(
        "Invalid timestamp '{raw}': expected ISO-8601"
    )))
}

#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub value: f64,
    /// Defaults to the time of ingestion.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub reading: sensor_readings::Model,
    pub breach: Option<Breach>,
    /// Set only when this reading opened a new alert.
    pub alert: Option<alerts::Model>,
}

impl IngestOutcome {
    /// True when the reading breached a threshold and a new alert was opened;
    /// a breach suppressed by an already open alert reports false.
    #[must_use]
    pub fn alert_triggered(&self) -> bool {
        self.alert.is_some()
    }
}

/// Store a reading, stamp the sensor, and open an alert on a threshold breach
/// unless the sensor already has an open one.
///
/// Runs in a single transaction; any persistence failure rolls the whole
/// ingestion back and is returned to the caller.
///
/// # Errors
///
/// `AppError::NotFound` when the sensor does not exist or belongs to a
/// parcel the caller does not own.
pub async fn ingest<C>(
    db: &C,
    user: &CurrentUser,
    sensor_id: i32,
    reading: Reading,
) -> AppResult<IngestOutcome>
where
    C: ConnectionTrait + TransactionTrait,
{
    let timestamp = reading.timestamp.unwrap_or_else(Utc::now);
    let txn = db.begin().await?;

    let (sensor, _parcel) = store::sensors::find_owned(&txn, user.id, sensor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sensor not found".to_string()))?;

    let stored = store::readings::insert(&txn, sensor.id, reading.value, timestamp).await?;
    store::sensors::set_last_reading_time(&txn, sensor.id, timestamp).await?;

    let breach = classify(reading.value, sensor.threshold_low, sensor.threshold_high);
    let alert = match breach {
        Some(breach) => open_alert(&txn, &sensor, breach, reading.value, timestamp).await?,
        None => None,
    };

    txn.commit().await?;

    tracing::debug!(
        sensor_id = sensor.id,
        reading_id = stored.id,
        value = reading.value,
        breach = ?breach,
        "reading_ingested"
    );

    Ok(IngestOutcome {
        reading: stored,
        breach,
        alert,
    })
}

async fn open_alert<C>(
    txn: &C,
    sensor: &sensors::Model,
    breach: Breach,
    value: f64,
    timestamp: DateTime<Utc>,
) -> AppResult<Option<alerts::Model>>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(existing) = store::alerts::find_open(txn, sensor.id).await? {
        tracing::debug!(sensor_id = sensor.id, alert_id = existing.id, "alert_suppressed");
        return Ok(None);
    }

    let created = store::alerts::insert_open(
        txn,
        NewAlert {
            sensor_id: sensor.id,
            message: breach_message(sensor, breach, value),
            level: AlertLevel::Warning,
            created_at: timestamp,
        },
    )
    .await?;

    match &created {
        Some(alert) => tracing::info!(
            sensor_id = sensor.id,
            alert_id = alert.id,
            message = %alert.message,
            "alert_opened"
        ),
        // Lost the race against a concurrent ingestion for the same sensor
        None => tracing::debug!(sensor_id = sensor.id, "alert_suppressed"),
    }

    Ok(created)
}
