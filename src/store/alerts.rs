use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
    TransactionTrait,
};

use crate::entity::alerts::{self, AlertLevel};
use crate::entity::{parcels, sensors};
use crate::error::AppResult;

pub struct NewAlert {
    pub sensor_id: i32,
    pub message: String,
    pub level: AlertLevel,
    pub created_at: DateTime<Utc>,
}

/// Which side of the lifecycle a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertScope {
    /// Active and not yet acknowledged
    Open,
    /// Acknowledged or resolved
    History,
}

/// Alert joined with the names needed by list views.
#[derive(Debug, Clone, FromQueryResult)]
pub struct AlertRow {
    pub id: i32,
    pub sensor_id: i32,
    pub sensor_name: String,
    pub parcel_name: String,
    pub message: String,
    pub level: AlertLevel,
    pub is_active: bool,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

fn open_condition() -> Condition {
    Condition::all()
        .add(alerts::Column::IsActive.eq(true))
        .add(alerts::Column::Acknowledged.eq(false))
}

/// The open alert of a sensor, if any.
pub async fn find_open<C: ConnectionTrait>(
    db: &C,
    sensor_id: i32,
) -> AppResult<Option<alerts::Model>> {
    Ok(alerts::Entity::find()
        .filter(alerts::Column::SensorId.eq(sensor_id))
        .filter(open_condition())
        .one(db)
        .await?)
}

/// Insert an open alert inside a savepoint.
///
/// The `alerts_one_open_per_sensor` unique index rejects a second open alert
/// for the same sensor; that rejection is reported as `Ok(None)` and leaves
/// the surrounding transaction usable.
pub async fn insert_open<C>(db: &C, alert: NewAlert) -> AppResult<Option<alerts::Model>>
where
    C: ConnectionTrait + TransactionTrait,
{
    let savepoint = db.begin().await?;
    let model = alerts::ActiveModel {
        sensor_id: Set(alert.sensor_id),
        message: Set(alert.message),
        level: Set(alert.level),
        is_active: Set(true),
        acknowledged: Set(false),
        created_at: Set(alert.created_at),
        ..Default::default()
    };

    match model.insert(&savepoint).await {
        Ok(created) => {
            savepoint.commit().await?;
            Ok(Some(created))
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// An alert on one of the owner's sensors.
pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    alert_id: i32,
) -> AppResult<Option<alerts::Model>> {
    Ok(alerts::Entity::find_by_id(alert_id)
        .join(JoinType::InnerJoin, alerts::Relation::Sensor.def())
        .join(JoinType::InnerJoin, sensors::Relation::Parcel.def())
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?)
}

pub async fn set_flags<C: ConnectionTrait>(
    db: &C,
    alert: alerts::Model,
    is_active: bool,
    acknowledged: bool,
) -> AppResult<alerts::Model> {
    let mut model: alerts::ActiveModel = alert.into();
    model.is_active = Set(is_active);
    model.acknowledged = Set(acknowledged);

    Ok(model.update(db).await?)
}

/// Alerts on the owner's sensors, newest first.
pub async fn list_owned<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    scope: AlertScope,
    limit: Option<u64>,
) -> AppResult<Vec<AlertRow>> {
    let scope_condition = match scope {
        AlertScope::Open => open_condition(),
        AlertScope::History => Condition::any()
            .add(alerts::Column::Acknowledged.eq(true))
            .add(alerts::Column::IsActive.eq(false)),
    };

    let mut query = alerts::Entity::find()
        .select_only()
        .column(alerts::Column::Id)
        .column(alerts::Column::SensorId)
        .column_as(sensors::Column::Name, "sensor_name")
        .column_as(parcels::Column::Name, "parcel_name")
        .column(alerts::Column::Message)
        .column(alerts::Column::Level)
        .column(alerts::Column::IsActive)
        .column(alerts::Column::Acknowledged)
        .column(alerts::Column::CreatedAt)
        .join(JoinType::InnerJoin, alerts::Relation::Sensor.def())
        .join(JoinType::InnerJoin, sensors::Relation::Parcel.def())
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .filter(scope_condition)
        .order_by_desc(alerts::Column::CreatedAt)
        .order_by_desc(alerts::Column::Id);

    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    Ok(query.into_model::<AlertRow>().all(db).await?)
}

pub async fn count_open_owned<C: ConnectionTrait>(db: &C, owner_id: i32) -> AppResult<u64> {
    Ok(alerts::Entity::find()
        .join(JoinType::InnerJoin, alerts::Relation::Sensor.def())
        .join(JoinType::InnerJoin, sensors::Relation::Parcel.def())
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .filter(open_condition())
        .count(db)
        .await?)
}

pub async fn delete_for_sensors<C: ConnectionTrait>(db: &C, sensor_ids: &[i32]) -> AppResult<()> {
    if sensor_ids.is_empty() {
        return Ok(());
    }
    alerts::Entity::delete_many()
        .filter(alerts::Column::SensorId.is_in(sensor_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}
