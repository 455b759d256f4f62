use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "critical")]
    Critical,
}

/// Lifecycle derived from the two flags:
/// open (active, unacknowledged) -> acknowledged (active, acknowledged)
/// -> resolved (inactive). Resolved is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    #[must_use]
    pub fn from_flags(is_active: bool, acknowledged: bool) -> Self {
        match (is_active, acknowledged) {
            (false, _) => Self::Resolved,
            (true, true) => Self::Acknowledged,
            (true, false) => Self::Open,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sensor_id: i32,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub level: AlertLevel,
    pub is_active: bool,
    pub acknowledged: bool,
    pub created_at: DateTimeUtc,
}

impl Model {
    #[must_use]
    pub fn status(&self) -> AlertStatus {
        AlertStatus::from_flags(self.is_active, self.acknowledged)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sensors::Entity",
        from = "Column::SensorId",
        to = "super::sensors::Column::Id",
        on_delete = "Cascade"
    )]
    Sensor,
}

impl Related<super::sensors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sensor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
