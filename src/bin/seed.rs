//! Populate an empty database with demo accounts, parcels, sensors and
//! a month of readings.

use chrono::{Duration, Timelike, Utc};
use rand::Rng;
use sea_orm::{ConnectOptions, Database, TransactionTrait};
use sea_orm_migration::MigratorTrait;

use agrotech_api::config::Config;
use agrotech_api::entity::sensors::SensorStatus;
use agrotech_api::entity::users::Role;
use agrotech_api::error::AppResult;
use agrotech_api::services::accounts::{self, Registration};
use agrotech_api::store;
use agrotech_api::store::parcels::ParcelFields;
use agrotech_api::store::sensors::SensorFields;

const DEMO_PASSWORD: &str = "password123";
const HISTORY_DAYS: i64 = 30;
const SAMPLE_EVERY_HOURS: usize = 4;

struct DemoUser {
    username: &'static str,
    email: &'static str,
    role: Role,
    api_key: &'static str,
}

const USERS: [DemoUser; 2] = [
    DemoUser {
        username: "farmer_john",
        email: "john@agrotech.com",
        role: Role::Farmer,
        api_key: "key_farmer_12345",
    },
    DemoUser {
        username: "tech_sarah",
        email: "sarah@agrotech.com",
        role: Role::Technician,
        api_key: "key_tech_67890",
    },
];

const PARCELS: [(&str, &str, f64, &str); 3] = [
    ("North Field", "Zone A, Valley", 15.5, "Corn"),
    ("Sunny Hill", "Zone B, Hillside", 8.2, "Wheat"),
    ("River Bank", "Zone C, River", 12.0, "Soybeans"),
];

const SENSOR_TYPES: [(&str, &str); 3] = [
    ("temperature", "Temperature"),
    ("soil_humidity", "Soil Humidity"),
    ("luminosity", "Luminosity"),
];

fn thresholds(sensor_type: &str) -> (f64, f64) {
    if sensor_type == "temperature" {
        (10.0, 35.0)
    } else {
        (30.0, 80.0)
    }
}

fn sample_value(sensor_type: &str, hour: u32, rng: &mut impl Rng) -> f64 {
    let base = if sensor_type == "temperature" { 25.0 } else { 60.0 };
    let variation = 5.0 * (f64::from(hour) / 24.0 * std::f64::consts::TAU).sin();
    base + variation + rng.gen_range(-2.0..2.0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agrotech_api=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let mut options = ConnectOptions::new(config.database_url.clone());
    options.max_connections(config.db_max_connections).sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;

    if store::users::find_by_email(&db, USERS[0].email).await?.is_some() {
        tracing::info!("Data already exists, skipping seed");
        return Ok(());
    }

    seed(&db).await?;
    tracing::info!("Database seeded");
    Ok(())
}

async fn seed<C>(db: &C) -> AppResult<()>
where
    C: sea_orm::ConnectionTrait + TransactionTrait,
{
    let mut owner_id = None;
    for demo in &USERS {
        let user = accounts::register(
            db,
            Registration {
                username: demo.username.to_string(),
                email: demo.email.to_string(),
                password: DEMO_PASSWORD.to_string(),
                role: demo.role,
            },
        )
        .await?;
        store::users::set_api_key(db, user.id, demo.api_key).await?;
        if demo.role == Role::Farmer {
            owner_id = Some(user.id);
        }
        tracing::info!(username = demo.username, api_key = demo.api_key, "demo_user_created");
    }
    let Some(owner_id) = owner_id else {
        return Ok(());
    };

    let txn = db.begin().await?;
    let mut sensors = Vec::new();
    for (name, location, size, crop_type) in PARCELS {
        let parcel = store::parcels::insert(
            &txn,
            owner_id,
            ParcelFields {
                name: name.to_string(),
                size,
                crop_type: crop_type.to_string(),
                location: location.to_string(),
            },
        )
        .await?;

        for (sensor_type, label) in SENSOR_TYPES {
            let (threshold_low, threshold_high) = thresholds(sensor_type);
            let sensor = store::sensors::insert(
                &txn,
                parcel.id,
                SensorFields {
                    name: format!("{label} Sensor {}", parcel.id),
                    sensor_type: sensor_type.to_string(),
                    status: SensorStatus::Active,
                    threshold_low,
                    threshold_high,
                },
            )
            .await?;
            sensors.push(sensor);
        }
    }

    let now = Utc::now();
    let mut rng = rand::thread_rng();
    for sensor in &sensors {
        let mut rows = Vec::new();
        for day in 0..HISTORY_DAYS {
            let date = now - Duration::days(HISTORY_DAYS - day);
            for hour in (0..24).step_by(SAMPLE_EVERY_HOURS) {
                let Some(timestamp) = date
                    .with_hour(hour)
                    .and_then(|t| t.with_minute(0))
                    .and_then(|t| t.with_second(0))
                    .and_then(|t| t.with_nanosecond(0))
                else {
                    continue;
                };
                rows.push((sensor.id, sample_value(&sensor.sensor_type, hour, &mut rng), timestamp));
            }
        }

        let count = rows.len();
        let last = rows.last().map(|(_, _, ts)| *ts);
        store::readings::insert_many(&txn, rows).await?;
        if let Some(last) = last {
            store::sensors::set_last_reading_time(&txn, sensor.id, last).await?;
        }
        tracing::debug!(sensor_id = sensor.id, readings = count, "sensor_history_seeded");
    }
    txn.commit().await?;

    tracing::info!(parcels = PARCELS.len(), sensors = sensors.len(), "demo_farm_created");
    Ok(())
}
