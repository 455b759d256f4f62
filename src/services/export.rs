//! CSV and JSON downloads of an analytics report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::services::analytics::{AnalyticsReport, SensorStats};

pub const EMPTY_EXPORT: &str = "No data to export.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// # Errors
    ///
    /// `AppError::BadRequest` for anything but `csv` or `json`.
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(AppError::BadRequest(format!(
                "Invalid format: {s}. Must be one of: csv, json"
            ))),
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

/// A rendered download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

#[must_use]
pub fn file_name(report: &AnalyticsReport, format: ExportFormat) -> String {
    format!(
        "sensor_data_{}_to_{}.{}",
        report.start.format("%Y-%m-%d"),
        report.end.format("%Y-%m-%d"),
        format.extension()
    )
}

/// One row per bucket: `Timestamp` then one column per legend entry.
/// Sensors without a value in a bucket get an empty cell.
///
/// # Errors
///
/// `AppError::Internal` if the CSV writer fails.
pub fn to_csv(report: &AnalyticsReport) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(report.legend.len() + 1);
    header.push("Timestamp".to_string());
    header.extend(report.legend.iter().map(|entry| entry.label.clone()));
    writer.write_record(&header).map_err(csv_error)?;

    for row in &report.series {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.bucket.clone());
        record.extend(report.legend.iter().map(|entry| {
            row.values
                .get(&entry.sensor_id)
                .map(ToString::to_string)
                .unwrap_or_default()
        }));
        writer.write_record(&record).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {e}")))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("CSV write failed: {e}"))
}

#[derive(Debug, Serialize)]
struct Period {
    start: String,
    end: String,
}

#[derive(Debug, Serialize)]
struct ExportedSensor<'a> {
    id: i32,
    /// Column of this sensor in each `data` row
    key: String,
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct JsonExport<'a> {
    period: Period,
    /// Legend in column order
    sensors: Vec<ExportedSensor<'a>>,
    /// One object per bucket keyed by `Timestamp` and `sensor_<id>`
    data: Vec<BTreeMap<String, serde_json::Value>>,
    statistics: &'a [SensorStats],
}

/// Labels may repeat across sensors; ids do not.
fn data_key(sensor_id: i32) -> String {
    format!("sensor_{sensor_id}")
}

/// Pretty-printed document with `period`, `sensors`, `data` and `statistics`.
///
/// # Errors
///
/// `AppError::Internal` if serialization fails.
pub fn to_json(report: &AnalyticsReport) -> AppResult<Vec<u8>> {
    let data = report
        .series
        .iter()
        .map(|row| {
            let mut object = BTreeMap::new();
            object.insert(
                "Timestamp".to_string(),
                serde_json::Value::from(row.bucket.clone()),
            );
            for entry in &report.legend {
                if let Some(value) = row.values.get(&entry.sensor_id) {
                    object.insert(data_key(entry.sensor_id), serde_json::Value::from(*value));
                }
            }
            object
        })
        .collect();

    let document = JsonExport {
        period: Period {
            start: report.start.format("%Y-%m-%d").to_string(),
            end: report.end.format("%Y-%m-%d").to_string(),
        },
        sensors: report
            .legend
            .iter()
            .map(|entry| ExportedSensor {
                id: entry.sensor_id,
                key: data_key(entry.sensor_id),
                label: &entry.label,
            })
            .collect(),
        data,
        statistics: &report.statistics,
    };

    serde_json::to_vec_pretty(&document)
        .map_err(|e| AppError::Internal(format!("JSON export failed: {e}")))
}

/// Render `report` for download.
///
/// # Errors
///
/// `AppError::BadRequest` when the report has no rows.
pub fn render(report: &AnalyticsReport, format: ExportFormat) -> AppResult<ExportFile> {
    if report.series.is_empty() {
        return Err(AppError::BadRequest(EMPTY_EXPORT.to_string()));
    }

    let body = match format {
        ExportFormat::Csv => to_csv(report)?,
        ExportFormat::Json => to_json(report)?,
    };

    Ok(ExportFile {
        file_name: file_name(report, format),
        content_type: format.content_type(),
        body,
    })
}
