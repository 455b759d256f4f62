mod handlers;
mod types;

pub use handlers::{delete_sensor, ingest_reading, sensor_history, update_sensor};
pub use types::{HistoryQuery, IngestRequest, IngestResponse};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_delete_sensor, __path_ingest_reading, __path_sensor_history, __path_update_sensor,
};
