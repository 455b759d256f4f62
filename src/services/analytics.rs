//! Time-bucketed comparison of up to five sensors over a date range.
//!
//! Readings are grouped by a bucket key derived from their timestamp
//! (`raw`, `hour` or `day`). Each row of the series carries the mean of every
//! selected sensor that has readings in that bucket; sensors without readings
//! are left out of the row rather than zero-filled. Statistics are computed
//! over the whole range, independent of the bucket width.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::entity::sensor_readings;
use crate::error::{AppError, AppResult};
use crate::store;

pub const MAX_COMPARED_SENSORS: usize = 5;
pub const SELECTION_LIMIT_WARNING: &str = "Max 5 sensors can be compared at once.";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Round half away from zero to two decimals.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Raw,
    Hour,
    Day,
}

impl Granularity {
    /// # Errors
    ///
    /// `AppError::BadRequest` for anything but `raw`, `hour` or `day`.
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "hour" | "hourly" => Ok(Self::Hour),
            "day" | "daily" => Ok(Self::Day),
            _ => Err(AppError::BadRequest(format!(
                "Invalid granularity: {s}. Must be one of: raw, hour, day"
            ))),
        }
    }

    /// Bucket label for a timestamp. Labels sort lexicographically in time order.
    #[must_use]
    pub fn bucket_key(self, timestamp: DateTime<Utc>) -> String {
        let format = match self {
            Self::Raw => "%Y-%m-%d %H:%M:%S",
            Self::Hour => "%Y-%m-%d %H:00",
            Self::Day => DATE_FORMAT,
        };
        timestamp.format(format).to_string()
    }
}

/// Inclusive calendar date range; readings are selected from `start` 00:00
/// up to, but excluding, the day after `end`. An `end` before `start` is an
/// empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    end_exclusive: NaiveDate,
}

impl DateRange {
    /// # Errors
    ///
    /// `AppError::BadRequest` when a date is not `YYYY-MM-DD` or lies at the
    /// edge of the representable calendar.
    pub fn parse(start: &str, end: &str) -> AppResult<Self> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map_err(|_| AppError::BadRequest("Invalid date format".to_string()))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        let end_exclusive = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::BadRequest("End date out of range".to_string()))?;
        Ok(Self {
            start,
            end,
            end_exclusive,
        })
    }

    /// Range ending `today` and starting 7, 30 or 90 days earlier.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` for an unknown preset.
    pub fn preset(name: &str, today: NaiveDate) -> AppResult<Self> {
        let days = match name {
            "7d" => 7,
            "30d" => 30,
            "90d" => 90,
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Invalid preset: {name}. Must be one of: 7d, 30d, 90d"
                )));
            }
        };
        let start = today
            .checked_sub_days(Days::new(days))
            .ok_or_else(|| AppError::BadRequest("Start date out of range".to_string()))?;
        Self::new(start, today)
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    /// Exclusive upper bound: midnight after `end`.
    #[must_use]
    pub fn end_time_exclusive(&self) -> DateTime<Utc> {
        self.end_exclusive
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
    }

    #[must_use]
    pub fn start_label(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    #[must_use]
    pub fn end_label(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
    Unchanged,
    /// The selection is full; nothing was added.
    LimitReached,
}

impl SelectionChange {
    #[must_use]
    pub fn warning(self) -> Option<&'static str> {
        match self {
            Self::LimitReached => Some(SELECTION_LIMIT_WARNING),
            _ => None,
        }
    }
}

/// Ordered set of at most [`MAX_COMPARED_SENSORS`] sensor ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorSelection {
    ids: Vec<i32>,
}

impl SensorSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `toggle(id, true)` for each id in order, collecting warnings once.
    #[must_use]
    pub fn from_requested(ids: impl IntoIterator<Item = i32>) -> (Self, Vec<String>) {
        let mut selection = Self::new();
        let mut warnings: Vec<String> = Vec::new();
        for id in ids {
            if let Some(warning) = selection.toggle(id, true).warning() {
                if !warnings.iter().any(|w| w == warning) {
                    warnings.push(warning.to_string());
                }
            }
        }
        (selection, warnings)
    }

    pub fn toggle(&mut self, sensor_id: i32, checked: bool) -> SelectionChange {
        let present = self.ids.contains(&sensor_id);
        match (checked, present) {
            (true, true) | (false, false) => SelectionChange::Unchanged,
            (true, false) if self.ids.len() >= MAX_COMPARED_SENSORS => SelectionChange::LimitReached,
            (true, false) => {
                self.ids.push(sensor_id);
                SelectionChange::Added
            }
            (false, true) => {
                self.ids.retain(|id| *id != sensor_id);
                SelectionChange::Removed
            }
        }
    }

    #[must_use]
    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// What the aggregation needs to know about a selected sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorInfo {
    pub id: i32,
    pub name: String,
    pub sensor_type: String,
    pub parcel_name: String,
}

impl SensorInfo {
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.parcel_name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LegendEntry {
    pub sensor_id: i32,
    /// `<parcel> - <sensor>`
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeriesRow {
    /// Bucket label
    pub bucket: String,
    /// Mean per sensor id, rounded to 2 decimals; sensors without readings are absent
    #[schema(value_type = Object)]
    pub values: BTreeMap<i32, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SensorStats {
    pub sensor_id: i32,
    pub name: String,
    pub parcel: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub series: Vec<SeriesRow>,
    pub statistics: Vec<SensorStats>,
}

/// Bucket readings of the selected sensors and compute per-sensor statistics.
///
/// Readings of sensors outside `selection` are ignored. Statistics appear in
/// selection order and only for sensors that have at least one reading.
#[must_use]
pub fn aggregate(
    readings: &[sensor_readings::Model],
    selection: &[SensorInfo],
    granularity: Granularity,
) -> Aggregation {
    let mut buckets: BTreeMap<String, BTreeMap<i32, (f64, usize)>> = BTreeMap::new();
    let mut sensor_values: BTreeMap<i32, Vec<f64>> =
        selection.iter().map(|s| (s.id, Vec::new())).collect();

    for reading in readings {
        let Some(values) = sensor_values.get_mut(&reading.sensor_id) else {
            continue;
        };
        values.push(reading.value);

        let (sum, count) = buckets
            .entry(granularity.bucket_key(reading.timestamp))
            .or_default()
            .entry(reading.sensor_id)
            .or_insert((0.0, 0));
        *sum += reading.value;
        *count += 1;
    }

    let series = buckets
        .into_iter()
        .map(|(bucket, per_sensor)| SeriesRow {
            bucket,
            values: per_sensor
                .into_iter()
                .map(|(sensor_id, (sum, count))| (sensor_id, round2(sum / count as f64)))
                .collect(),
        })
        .collect();

    let statistics = selection
        .iter()
        .filter_map(|sensor| {
            let values = sensor_values.get(&sensor.id)?;
            if values.is_empty() {
                return None;
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = values.iter().sum::<f64>() / values.len() as f64;
            Some(SensorStats {
                sensor_id: sensor.id,
                name: sensor.name.clone(),
                parcel: sensor.parcel_name.clone(),
                sensor_type: sensor.sensor_type.clone(),
                min: round2(min),
                max: round2(max),
                avg: round2(avg),
                count: values.len(),
            })
        })
        .collect();

    Aggregation { series, statistics }
}

#[derive(Debug, Clone)]
pub struct AnalyticsRequest {
    /// Requested sensors in order; empty selects the caller's first sensor.
    pub sensor_ids: Vec<i32>,
    pub range: DateRange,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalyticsReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
    pub legend: Vec<LegendEntry>,
    pub series: Vec<SeriesRow>,
    pub statistics: Vec<SensorStats>,
    /// User-facing notices, e.g. a selection capped at five sensors
    pub warnings: Vec<String>,
}

/// Load the caller's readings for the requested sensors and aggregate them.
///
/// # Errors
///
/// `AppError::NotFound` when a selected sensor is unknown or not owned.
pub async fn run<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    request: AnalyticsRequest,
) -> AppResult<AnalyticsReport> {
    let owned = store::sensors::list_owned(db, user.id).await?;

    let (selection, warnings) = if request.sensor_ids.is_empty() {
        SensorSelection::from_requested(owned.first().map(|(sensor, _)| sensor.id))
    } else {
        SensorSelection::from_requested(request.sensor_ids.iter().copied())
    };

    let infos = selection
        .ids()
        .iter()
        .map(|id| {
            owned
                .iter()
                .find(|(sensor, _)| sensor.id == *id)
                .map(|(sensor, parcel)| SensorInfo {
                    id: sensor.id,
                    name: sensor.name.clone(),
                    sensor_type: sensor.sensor_type.clone(),
                    parcel_name: parcel.name.clone(),
                })
                .ok_or_else(|| AppError::NotFound(format!("Sensor {id} not found")))
        })
        .collect::<AppResult<Vec<_>>>()?;

    let readings = store::readings::in_range(
        db,
        selection.ids(),
        request.range.start_time(),
        request.range.end_time_exclusive(),
    )
    .await?;

    let aggregation = aggregate(&readings, &infos, request.granularity);

    tracing::debug!(
        user_id = user.id,
        sensors = selection.len(),
        readings = readings.len(),
        buckets = aggregation.series.len(),
        granularity = ?request.granularity,
        "analytics_aggregated"
    );

    Ok(AnalyticsReport {
        start: request.range.start,
        end: request.range.end,
        granularity: request.granularity,
        legend: infos
            .iter()
            .map(|s| LegendEntry {
                sensor_id: s.id,
                label: s.label(),
            })
            .collect(),
        series: aggregation.series,
        statistics: aggregation.statistics,
        warnings,
    })
}
