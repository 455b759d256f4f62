use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestRequest {
    pub value: f64,
    /// ISO-8601; defaults to the time of ingestion
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    /// Always `success`
    pub status: String,
    /// True when this reading opened a new alert
    pub alert_triggered: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of readings (default: 100, max: 1000)
    pub limit: Option<u64>,
}
