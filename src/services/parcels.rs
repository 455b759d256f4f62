//! Parcel management, always scoped to the calling owner.

use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::entity::parcels;
use crate::error::{AppError, AppResult};
use crate::store;
use crate::store::parcels::ParcelFields;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ParcelInput {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    /// Hectares, strictly positive
    pub size: f64,
    #[validate(length(min = 1, message = "crop_type must not be empty"))]
    pub crop_type: String,
    #[validate(length(min = 1, message = "location must not be empty"))]
    pub location: String,
}

impl ParcelInput {
    fn into_fields(self) -> AppResult<ParcelFields> {
        self.validate()?;
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(AppError::BadRequest(
                "size must be a positive number".to_string(),
            ));
        }
        Ok(ParcelFields {
            name: self.name.trim().to_string(),
            size: self.size,
            crop_type: self.crop_type.trim().to_string(),
            location: self.location.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParcelView {
    pub id: i32,
    pub name: String,
    pub size: f64,
    pub crop_type: String,
    pub location: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<parcels::Model> for ParcelView {
    fn from(parcel: parcels::Model) -> Self {
        Self {
            id: parcel.id,
            name: parcel.name,
            size: parcel.size,
            crop_type: parcel.crop_type,
            location: parcel.location,
            created_at: parcel.created_at,
        }
    }
}

pub async fn list<C: ConnectionTrait>(db: &C, user: &CurrentUser) -> AppResult<Vec<ParcelView>> {
    let parcels = store::parcels::list_owned(db, user.id).await?;
    Ok(parcels.into_iter().map(ParcelView::from).collect())
}

/// # Errors
///
/// `AppError::Validation` or `AppError::BadRequest` for invalid fields.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    input: ParcelInput,
) -> AppResult<ParcelView> {
    let fields = input.into_fields()?;
    let parcel = store::parcels::insert(db, user.id, fields).await?;
    tracing::info!(user_id = user.id, parcel_id = parcel.id, "parcel_created");
    Ok(parcel.into())
}

/// # Errors
///
/// `AppError::NotFound` when the parcel is unknown or not owned.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    parcel_id: i32,
    input: ParcelInput,
) -> AppResult<ParcelView> {
    let fields = input.into_fields()?;
    let parcel = store::parcels::find_owned(db, user.id, parcel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Parcel not found".to_string()))?;

    let updated = store::parcels::update(db, parcel, fields).await?;
    tracing::info!(user_id = user.id, parcel_id, "parcel_updated");
    Ok(updated.into())
}

/// Delete a parcel with its sensors, readings and alerts in one transaction.
/// Returns false, without touching anything, when the parcel is unknown or
/// not owned.
pub async fn delete<C>(db: &C, user: &CurrentUser, parcel_id: i32) -> AppResult<bool>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let Some(parcel) = store::parcels::find_owned(&txn, user.id, parcel_id).await? else {
        tracing::debug!(user_id = user.id, parcel_id, "parcel_delete_ignored");
        return Ok(false);
    };

    let sensor_ids: Vec<i32> = store::sensors::list_for_parcel(&txn, parcel.id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();

    store::alerts::delete_for_sensors(&txn, &sensor_ids).await?;
    store::readings::delete_for_sensors(&txn, &sensor_ids).await?;
    store::sensors::delete_many(&txn, &sensor_ids).await?;
    store::parcels::delete(&txn, parcel.id).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = user.id,
        parcel_id,
        sensors = sensor_ids.len(),
        "parcel_deleted"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(size: f64) -> ParcelInput {
        ParcelInput {
            name: "North Field".to_string(),
            size,
            crop_type: "Wheat".to_string(),
            location: "Valley".to_string(),
        }
    }

    #[test]
    fn size_must_be_positive_and_finite() {
        assert!(input(2.5).into_fields().is_ok());
        for size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(input(size).into_fields(), Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn blank_names_fail_validation() {
        let mut parcel = input(1.0);
        parcel.name = String::new();
        assert!(matches!(parcel.into_fields(), Err(AppError::Validation(_))));
    }
}
