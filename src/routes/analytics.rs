use axum::{
    extract::{Query, State},
    http::{
        header::{self, HeaderValue},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::CurrentUser;
use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::services::analytics::{self, AnalyticsReport, AnalyticsRequest, DateRange, Granularity};
use crate::services::export::{self, ExportFormat};

const DEFAULT_PRESET: &str = "7d";

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnalyticsQuery {
    /// Comma-separated sensor IDs, at most 5 are compared (default: first sensor)
    pub sensor_ids: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub start: Option<String>,
    /// End date, inclusive (YYYY-MM-DD)
    pub end: Option<String>,
    /// Range ending today: 7d, 30d or 90d; overrides start/end
    pub preset: Option<String>,
    /// raw (default), hour or day
    pub granularity: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExportQuery {
    /// csv (default) or json
    pub format: Option<String>,
    /// Comma-separated sensor IDs, at most 5 are compared (default: first sensor)
    pub sensor_ids: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub start: Option<String>,
    /// End date, inclusive (YYYY-MM-DD)
    pub end: Option<String>,
    /// Range ending today: 7d, 30d or 90d; overrides start/end
    pub preset: Option<String>,
    /// raw (default), hour or day
    pub granularity: Option<String>,
}

impl ExportQuery {
    fn split(self) -> (Option<String>, AnalyticsQuery) {
        (
            self.format,
            AnalyticsQuery {
                sensor_ids: self.sensor_ids,
                start: self.start,
                end: self.end,
                preset: self.preset,
                granularity: self.granularity,
            },
        )
    }
}

fn parse_sensor_ids(raw: Option<&str>) -> AppResult<Vec<i32>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| AppError::BadRequest(format!("Invalid sensor id: {s}")))
        })
        .collect()
}

impl AnalyticsQuery {
    fn into_request(self) -> AppResult<AnalyticsRequest> {
        let range = match (self.preset.as_deref(), self.start.as_deref(), self.end.as_deref()) {
            (Some(preset), _, _) => DateRange::preset(preset, Utc::now().date_naive())?,
            (None, Some(start), Some(end)) => DateRange::parse(start, end)?,
            (None, None, None) => DateRange::preset(DEFAULT_PRESET, Utc::now().date_naive())?,
            _ => {
                return Err(AppError::BadRequest(
                    "start and end must be given together".to_string(),
                ));
            }
        };

        Ok(AnalyticsRequest {
            sensor_ids: parse_sensor_ids(self.sensor_ids.as_deref())?,
            range,
            granularity: self
                .granularity
                .as_deref()
                .map(Granularity::parse)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Compare up to five sensors over a date range
#[utoipa::path(
    get,
    path = "/api/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Bucketed series and statistics", body = AnalyticsReport),
        (status = 400, description = "Invalid date, preset or granularity"),
        (status = 404, description = "Sensor not found"),
    ),
    security(("api_key" = [])),
    tag = "analytics"
)]
pub async fn get_analytics(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<AnalyticsReport>> {
    let request = query.into_request()?;
    Ok(Json(analytics::run(&state.db, &user, request).await?))
}

/// Download the comparison as CSV or JSON
#[utoipa::path(
    get,
    path = "/api/analytics/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "File attachment"),
        (status = 400, description = "Invalid parameters or no data to export"),
        (status = 503, description = "Too many concurrent exports"),
    ),
    security(("api_key" = [])),
    tag = "analytics"
)]
pub async fn export_analytics(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let (format, query) = query.split();
    let format = format
        .as_deref()
        .map(ExportFormat::parse)
        .transpose()?
        .unwrap_or(ExportFormat::Csv);
    let request = query.into_request()?;

    let Ok(_permit) = state.export_permits.clone().try_acquire_owned() else {
        tracing::warn!(
            format = format.extension(),
            status = StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            "export_rejected"
        );
        return Err(AppError::ServiceUnavailable(
            "Too many concurrent exports. Please try again later.".to_string(),
        ));
    };

    let report = analytics::run(&state.db, &user, request).await?;
    let file = export::render(&report, format)?;

    tracing::info!(
        user_id = user.id,
        file = %file.file_name,
        bytes = file.body.len(),
        "export_rendered"
    );

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.file_name))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_ids_are_comma_separated() {
        assert_eq!(parse_sensor_ids(Some("1, 2,,3")).unwrap(), vec![1, 2, 3]);
        assert!(parse_sensor_ids(None).unwrap().is_empty());
        assert!(parse_sensor_ids(Some("1,abc")).is_err());
    }

    #[test]
    fn half_open_date_range_is_rejected() {
        let query = AnalyticsQuery {
            sensor_ids: None,
            start: Some("2024-01-01".to_string()),
            end: None,
            preset: None,
            granularity: None,
        };
        assert!(matches!(query.into_request(), Err(AppError::BadRequest(_))));
    }
}
