//! Alert lifecycle: open -> acknowledged -> resolved.

use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::entity::alerts::{AlertLevel, AlertStatus};
use crate::error::AppResult;
use crate::store;
use crate::store::alerts::{AlertRow, AlertScope};

pub const DEFAULT_HISTORY_LIMIT: u64 = 50;
pub const MAX_HISTORY_LIMIT: u64 = 1000;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertView {
    pub id: i32,
    pub sensor_id: i32,
    /// Sensor name
    pub sensor: String,
    /// Parcel name
    pub parcel: String,
    pub message: String,
    pub level: AlertLevel,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
}

impl From<AlertRow> for AlertView {
    fn from(row: AlertRow) -> Self {
        let status = AlertStatus::from_flags(row.is_active, row.acknowledged);
        Self {
            id: row.id,
            sensor_id: row.sensor_id,
            sensor: row.sensor_name,
            parcel: row.parcel_name,
            message: row.message,
            level: row.level,
            created_at: row.created_at,
            status,
        }
    }
}

/// Mark an alert acknowledged. Unknown ids and alerts outside the caller's
/// parcels are ignored; repeating the call changes nothing.
pub async fn acknowledge<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    alert_id: i32,
) -> AppResult<Option<AlertStatus>> {
    let Some(alert) = store::alerts::find_owned(db, user.id, alert_id).await? else {
        tracing::debug!(alert_id, user_id = user.id, "acknowledge_ignored");
        return Ok(None);
    };
    if alert.acknowledged {
        return Ok(Some(alert.status()));
    }

    let is_active = alert.is_active;
    let updated = store::alerts::set_flags(db, alert, is_active, true).await?;
    tracing::info!(alert_id, sensor_id = updated.sensor_id, "alert_acknowledged");
    Ok(Some(updated.status()))
}

/// Resolve an alert; resolving implies acknowledging. Same no-op rules as
/// [`acknowledge`].
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    alert_id: i32,
) -> AppResult<Option<AlertStatus>> {
    let Some(alert) = store::alerts::find_owned(db, user.id, alert_id).await? else {
        tracing::debug!(alert_id, user_id = user.id, "resolve_ignored");
        return Ok(None);
    };
    if !alert.is_active && alert.acknowledged {
        return Ok(Some(alert.status()));
    }

    let updated = store::alerts::set_flags(db, alert, false, true).await?;
    tracing::info!(alert_id, sensor_id = updated.sensor_id, "alert_resolved");
    Ok(Some(updated.status()))
}

/// Open alerts on the caller's sensors, newest first.
pub async fn list_active<C: ConnectionTrait>(db: &C, user: &CurrentUser) -> AppResult<Vec<AlertView>> {
    let rows = store::alerts::list_owned(db, user.id, AlertScope::Open, None).await?;
    Ok(rows.into_iter().map(AlertView::from).collect())
}

/// Clamp a requested history size to `1..=MAX_HISTORY_LIMIT`.
#[must_use]
pub fn history_limit(requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

/// Acknowledged or resolved alerts, newest first, at most `limit`.
pub async fn list_history<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    limit: Option<u64>,
) -> AppResult<Vec<AlertView>> {
    let limit = history_limit(limit);
    let rows = store::alerts::list_owned(db, user.id, AlertScope::History, Some(limit)).await?;
    Ok(rows.into_iter().map(AlertView::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_defaults_and_clamps() {
        assert_eq!(history_limit(None), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history_limit(Some(0)), 1);
        assert_eq!(history_limit(Some(u64::MAX)), MAX_HISTORY_LIMIT);
    }
}
