use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};

use crate::entity::sensors::{self, SensorStatus};
use crate::entity::parcels;
use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct SensorFields {
    pub name: String,
    pub sensor_type: String,
    pub status: SensorStatus,
    pub threshold_low: f64,
    pub threshold_high: f64,
}

/// Look up a sensor together with its parcel, only if the parcel belongs to `owner_id`.
pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    sensor_id: i32,
) -> AppResult<Option<(sensors::Model, parcels::Model)>> {
    let row = sensors::Entity::find_by_id(sensor_id)
        .find_also_related(parcels::Entity)
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?;

    Ok(row.and_then(|(sensor, parcel)| parcel.map(|p| (sensor, p))))
}

/// Every sensor on the owner's parcels, ordered by sensor id.
pub async fn list_owned<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
) -> AppResult<Vec<(sensors::Model, parcels::Model)>> {
    let rows = sensors::Entity::find()
        .find_also_related(parcels::Entity)
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .order_by_asc(sensors::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(sensor, parcel)| parcel.map(|p| (sensor, p)))
        .collect())
}

pub async fn list_for_parcel<C: ConnectionTrait>(
    db: &C,
    parcel_id: i32,
) -> AppResult<Vec<sensors::Model>> {
    Ok(sensors::Entity::find()
        .filter(sensors::Column::ParcelId.eq(parcel_id))
        .order_by_asc(sensors::Column::Id)
        .all(db)
        .await?)
}

pub async fn count_owned<C: ConnectionTrait>(db: &C, owner_id: i32) -> AppResult<u64> {
    Ok(sensors::Entity::find()
        .join(JoinType::InnerJoin, sensors::Relation::Parcel.def())
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .count(db)
        .await?)
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    parcel_id: i32,
    fields: SensorFields,
) -> AppResult<sensors::Model> {
    let model = sensors::ActiveModel {
        name: Set(fields.name),
        sensor_type: Set(fields.sensor_type),
        status: Set(fields.status),
        parcel_id: Set(parcel_id),
        threshold_low: Set(fields.threshold_low),
        threshold_high: Set(fields.threshold_high),
        last_reading_time: Set(None),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    sensor: sensors::Model,
    fields: SensorFields,
) -> AppResult<sensors::Model> {
    let mut model: sensors::ActiveModel = sensor.into();
    model.name = Set(fields.name);
    model.sensor_type = Set(fields.sensor_type);
    model.status = Set(fields.status);
    model.threshold_low = Set(fields.threshold_low);
    model.threshold_high = Set(fields.threshold_high);

    Ok(model.update(db).await?)
}

pub async fn set_last_reading_time<C: ConnectionTrait>(
    db: &C,
    sensor_id: i32,
    timestamp: DateTime<Utc>,
) -> AppResult<()> {
    sensors::Entity::update_many()
        .col_expr(sensors::Column::LastReadingTime, timestamp.into())
        .filter(sensors::Column::Id.eq(sensor_id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn delete_many<C: ConnectionTrait>(db: &C, sensor_ids: &[i32]) -> AppResult<()> {
    if sensor_ids.is_empty() {
        return Ok(());
    }
    sensors::Entity::delete_many()
        .filter(sensors::Column::Id.is_in(sensor_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}
