use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::store;

pub const DEFAULT_RECENT_LIMIT: u64 = 10;
const MAX_RECENT_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_parcels: u64,
    pub total_sensors: u64,
    /// Active and unacknowledged
    pub active_alerts: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecentReading {
    pub id: i32,
    pub sensor_id: i32,
    pub sensor: String,
    pub sensor_type: String,
    pub parcel: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

pub async fn summary<C: ConnectionTrait>(db: &C, user: &CurrentUser) -> AppResult<DashboardSummary> {
    Ok(DashboardSummary {
        total_parcels: store::parcels::count_owned(db, user.id).await?,
        total_sensors: store::sensors::count_owned(db, user.id).await?,
        active_alerts: store::alerts::count_open_owned(db, user.id).await?,
    })
}

/// Latest readings across every sensor the caller owns, newest first.
pub async fn recent_readings<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    limit: Option<u64>,
) -> AppResult<Vec<RecentReading>> {
    let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);

    let owned = store::sensors::list_owned(db, user.id).await?;
    let ids: Vec<i32> = owned.iter().map(|(sensor, _)| sensor.id).collect();
    let by_id: HashMap<i32, _> = owned.iter().map(|(s, p)| (s.id, (s, p))).collect();

    let readings = store::readings::latest_for_sensors(db, &ids, limit).await?;
    Ok(readings
        .into_iter()
        .filter_map(|reading| {
            let (sensor, parcel) = by_id.get(&reading.sensor_id)?;
            Some(RecentReading {
                id: reading.id,
                sensor_id: reading.sensor_id,
                sensor: sensor.name.clone(),
                sensor_type: sensor.sensor_type.clone(),
                parcel: parcel.name.clone(),
                value: reading.value,
                timestamp: reading.timestamp,
            })
        })
        .collect())
}
