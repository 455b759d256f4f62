use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== USERS ==========
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(16)
                            .not_null()
                            .default("farmer"),
                    )
                    .col(ColumnDef::new(Users::ApiKey).string_len(64).unique_key())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== PARCELS ==========
        manager
            .create_table(
                Table::create()
                    .table(Parcels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parcels::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Parcels::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Parcels::Size).double().not_null())
                    .col(ColumnDef::new(Parcels::CropType).string_len(64).not_null())
                    .col(ColumnDef::new(Parcels::Location).string_len(255).not_null())
                    .col(ColumnDef::new(Parcels::OwnerId).integer().not_null())
                    .col(
                        ColumnDef::new(Parcels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parcels_owner")
                            .from(Parcels::Table, Parcels::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parcels_owner")
                    .table(Parcels::Table)
                    .col(Parcels::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ========== SENSORS ==========
        manager
            .create_table(
                Table::create()
                    .table(Sensors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sensors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sensors::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Sensors::SensorType).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Sensors::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Sensors::ParcelId).integer().not_null())
                    .col(
                        ColumnDef::new(Sensors::ThresholdLow)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Sensors::ThresholdHigh)
                            .double()
                            .not_null()
                            .default(100.0),
                    )
                    .col(ColumnDef::new(Sensors::LastReadingTime).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sensors_parcel")
                            .from(Sensors::Table, Sensors::ParcelId)
                            .to(Parcels::Table, Parcels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sensors_parcel")
                    .table(Sensors::Table)
                    .col(Sensors::ParcelId)
                    .to_owned(),
            )
            .await?;

        // ========== SENSOR READINGS ==========
        manager
            .create_table(
                Table::create()
                    .table(SensorReadings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SensorReadings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SensorReadings::SensorId).integer().not_null())
                    .col(ColumnDef::new(SensorReadings::Value).double().not_null())
                    .col(
                        ColumnDef::new(SensorReadings::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sensor_readings_sensor")
                            .from(SensorReadings::Table, SensorReadings::SensorId)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Range scans per sensor (history, analytics)
        manager
            .create_index(
                Index::create()
                    .name("idx_sensor_readings_sensor_time")
                    .table(SensorReadings::Table)
                    .col(SensorReadings::SensorId)
                    .col(SensorReadings::Timestamp)
                    .to_owned(),
            )
            .await?;

        // ========== ALERTS ==========
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alerts::SensorId).integer().not_null())
                    .col(ColumnDef::new(Alerts::Message).text().not_null())
                    .col(
                        ColumnDef::new(Alerts::Level)
                            .string_len(16)
                            .not_null()
                            .default("warning"),
                    )
                    .col(
                        ColumnDef::new(Alerts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Alerts::Acknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_sensor")
                            .from(Alerts::Table, Alerts::SensorId)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_sensor_created")
                    .table(Alerts::Table)
                    .col(Alerts::SensorId)
                    .col(Alerts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // At most one open (active, unacknowledged) alert per sensor.
        // Partial index syntax is shared by Postgres and SQLite.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS alerts_one_open_per_sensor \
                 ON alerts (sensor_id) WHERE is_active = TRUE AND acknowledged = FALSE",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS alerts_one_open_per_sensor")
            .await?;

        manager
            .drop_table(Table::drop().table(Alerts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SensorReadings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sensors::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parcels::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Role,
    ApiKey,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Parcels {
    Table,
    Id,
    Name,
    Size,
    CropType,
    Location,
    OwnerId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sensors {
    Table,
    Id,
    Name,
    SensorType,
    Status,
    ParcelId,
    ThresholdLow,
    ThresholdHigh,
    LastReadingTime,
}

#[derive(DeriveIden)]
enum SensorReadings {
    Table,
    Id,
    SensorId,
    Value,
    Timestamp,
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    SensorId,
    Message,
    Level,
    IsActive,
    Acknowledged,
    CreatedAt,
}
