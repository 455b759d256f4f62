use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entity::parcels;
use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct ParcelFields {
    pub name: String,
    pub size: f64,
    pub crop_type: String,
    pub location: String,
}

pub async fn list_owned<C: ConnectionTrait>(db: &C, owner_id: i32) -> AppResult<Vec<parcels::Model>> {
    Ok(parcels::Entity::find()
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .order_by_asc(parcels::Column::Id)
        .all(db)
        .await?)
}

/// A parcel that does not exist and one owned by someone else look the same.
pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    parcel_id: i32,
) -> AppResult<Option<parcels::Model>> {
    Ok(parcels::Entity::find_by_id(parcel_id)
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?)
}

pub async fn count_owned<C: ConnectionTrait>(db: &C, owner_id: i32) -> AppResult<u64> {
    Ok(parcels::Entity::find()
        .filter(parcels::Column::OwnerId.eq(owner_id))
        .count(db)
        .await?)
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    fields: ParcelFields,
) -> AppResult<parcels::Model> {
    let model = parcels::ActiveModel {
        name: Set(fields.name),
        size: Set(fields.size),
        crop_type: Set(fields.crop_type),
        location: Set(fields.location),
        owner_id: Set(owner_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    parcel: parcels::Model,
    fields: ParcelFields,
) -> AppResult<parcels::Model> {
    let mut model: parcels::ActiveModel = parcel.into();
    model.name = Set(fields.name);
    model.size = Set(fields.size);
    model.crop_type = Set(fields.crop_type);
    model.location = Set(fields.location);

    Ok(model.update(db).await?)
}

pub async fn delete<C: ConnectionTrait>(db: &C, parcel_id: i32) -> AppResult<()> {
    parcels::Entity::delete_by_id(parcel_id).exec(db).await?;
    Ok(())
}
