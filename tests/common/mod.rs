#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

use agrotech_api::auth::CurrentUser;
use agrotech_api::common::AppState;
use agrotech_api::config::Config;
use agrotech_api::entity::sensors::SensorStatus;
use agrotech_api::entity::users::Role;
use agrotech_api::entity::{parcels, sensors};
use agrotech_api::routes;
use agrotech_api::store;
use agrotech_api::store::parcels::ParcelFields;
use agrotech_api::store::sensors::SensorFields;
use agrotech_api::store::users::NewUser;

/// Fresh in-memory database with the schema applied. One pooled connection
/// keeps every query on the same SQLite memory instance.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub fn test_app(db: DatabaseConnection) -> Router {
    let mut config = Config::with_database_url("sqlite::memory:");
    config.disable_rate_limiting = true;
    test_app_with_config(db, config)
}

pub fn test_app_with_config(db: DatabaseConnection, config: Config) -> Router {
    routes::build_router(AppState::new(db, config))
}

pub async fn create_user(db: &DatabaseConnection, username: &str, api_key: &str) -> CurrentUser {
    let user = store::users::insert(
        db,
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
            role: Role::Farmer,
            api_key: api_key.to_string(),
        },
    )
    .await
    .unwrap();
    CurrentUser::from(user)
}

pub async fn create_parcel(db: &DatabaseConnection, owner: &CurrentUser, name: &str) -> parcels::Model {
    store::parcels::insert(
        db,
        owner.id,
        ParcelFields {
            name: name.to_string(),
            size: 10.0,
            crop_type: "Corn".to_string(),
            location: "Valley".to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn create_sensor(
    db: &DatabaseConnection,
    parcel_id: i32,
    name: &str,
    low: f64,
    high: f64,
) -> sensors::Model {
    store::sensors::insert(
        db,
        parcel_id,
        SensorFields {
            name: name.to_string(),
            sensor_type: "soil_humidity".to_string(),
            status: SensorStatus::Active,
            threshold_low: low,
            threshold_high: high,
        },
    )
    .await
    .unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// Run one request through the router; the body is parsed as JSON when present.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, api_key: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-api-key", api_key)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
