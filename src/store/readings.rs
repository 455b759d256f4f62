use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::sensor_readings;
use crate::error::AppResult;

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    sensor_id: i32,
    value: f64,
    timestamp: DateTime<Utc>,
) -> AppResult<sensor_readings::Model> {
    let model = sensor_readings::ActiveModel {
        sensor_id: Set(sensor_id),
        value: Set(value),
        timestamp: Set(timestamp),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// Bulk insert of `(sensor_id, value, timestamp)` rows.
pub async fn insert_many<C: ConnectionTrait>(
    db: &C,
    rows: Vec<(i32, f64, DateTime<Utc>)>,
) -> AppResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let models = rows
        .into_iter()
        .map(|(sensor_id, value, timestamp)| sensor_readings::ActiveModel {
            sensor_id: Set(sensor_id),
            value: Set(value),
            timestamp: Set(timestamp),
            ..Default::default()
        });

    sensor_readings::Entity::insert_many(models).exec(db).await?;
    Ok(())
}

/// Most recent readings of one sensor, newest first.
pub async fn latest<C: ConnectionTrait>(
    db: &C,
    sensor_id: i32,
    limit: u64,
) -> AppResult<Vec<sensor_readings::Model>> {
    Ok(sensor_readings::Entity::find()
        .filter(sensor_readings::Column::SensorId.eq(sensor_id))
        .order_by_desc(sensor_readings::Column::Timestamp)
        .order_by_desc(sensor_readings::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}

/// Most recent readings across several sensors, newest first.
pub async fn latest_for_sensors<C: ConnectionTrait>(
    db: &C,
    sensor_ids: &[i32],
    limit: u64,
) -> AppResult<Vec<sensor_readings::Model>> {
    if sensor_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(sensor_readings::Entity::find()
        .filter(sensor_readings::Column::SensorId.is_in(sensor_ids.iter().copied()))
        .order_by_desc(sensor_readings::Column::Timestamp)
        .order_by_desc(sensor_readings::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}

/// Readings of the given sensors with `start <= timestamp < end`, oldest first.
pub async fn in_range<C: ConnectionTrait>(
    db: &C,
    sensor_ids: &[i32],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<sensor_readings::Model>> {
    if sensor_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(sensor_readings::Entity::find()
        .filter(sensor_readings::Column::SensorId.is_in(sensor_ids.iter().copied()))
        .filter(sensor_readings::Column::Timestamp.gte(start))
        .filter(sensor_readings::Column::Timestamp.lt(end))
        .order_by_asc(sensor_readings::Column::Timestamp)
        .order_by_asc(sensor_readings::Column::Id)
        .all(db)
        .await?)
}

pub async fn delete_for_sensors<C: ConnectionTrait>(db: &C, sensor_ids: &[i32]) -> AppResult<()> {
    if sensor_ids.is_empty() {
        return Ok(());
    }
    sensor_readings::Entity::delete_many()
        .filter(sensor_readings::Column::SensorId.is_in(sensor_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}
