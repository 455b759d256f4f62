use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Bounds concurrent CSV/JSON export requests.
    pub export_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let export_permits = Arc::new(Semaphore::new(config.bulk_concurrent_limit.max(1)));

        Self {
            db,
            config: Arc::new(config),
            export_permits,
        }
    }
}
