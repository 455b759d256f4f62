mod common;

use agrotech_api::entity::alerts::AlertLevel;
use agrotech_api::error::AppError;
use agrotech_api::services::ingest::{self, Breach, Reading};
use agrotech_api::store;
use agrotech_api::store::alerts::NewAlert;

use common::{at, create_parcel, create_sensor, create_user, setup_db};

#[tokio::test]
async fn second_breach_is_suppressed_while_an_alert_is_open() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;

    let first = ingest::ingest(
        &db,
        &user,
        sensor.id,
        Reading {
            value: 5.0,
            timestamp: Some(at(2024, 1, 1, 8, 0, 0)),
        },
    )
    .await
    .unwrap();
    assert_eq!(first.breach, Some(Breach::Low));
    assert!(first.alert_triggered());

    let alert = first.alert.as_ref().unwrap();
    assert_eq!(alert.message, "Low soil_humidity detected: 5.00 (Threshold: 10)");
    assert_eq!(alert.level, AlertLevel::Warning);
    assert_eq!(alert.created_at, at(2024, 1, 1, 8, 0, 0));

    let second = ingest::ingest(
        &db,
        &user,
        sensor.id,
        Reading {
            value: 3.0,
            timestamp: Some(at(2024, 1, 1, 9, 0, 0)),
        },
    )
    .await
    .unwrap();
    assert_eq!(second.breach, Some(Breach::Low));
    assert!(!second.alert_triggered());

    // Both readings stored, exactly one open alert
    let readings = store::readings::latest(&db, sensor.id, 10).await.unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(store::alerts::count_open_owned(&db, user.id).await.unwrap(), 1);

    let (stamped, _) = store::sensors::find_owned(&db, user.id, sensor.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stamped.last_reading_time, Some(at(2024, 1, 1, 9, 0, 0)));
}

#[tokio::test]
async fn in_range_reading_opens_nothing() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;

    for value in [10.0, 30.0, 50.0] {
        let outcome = ingest::ingest(
            &db,
            &user,
            sensor.id,
            Reading {
                value,
                timestamp: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome.breach, None);
        assert!(!outcome.alert_triggered());
    }

    assert_eq!(store::alerts::count_open_owned(&db, user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn high_breach_after_resolution_opens_a_new_alert() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;

    let first = ingest::ingest(&db, &user, sensor.id, Reading { value: 75.5, timestamp: None })
        .await
        .unwrap();
    let alert = first.alert.unwrap();
    assert_eq!(alert.message, "High soil_humidity detected: 75.50 (Threshold: 50)");

    agrotech_api::services::alerts::resolve(&db, &user, alert.id)
        .await
        .unwrap();

    let again = ingest::ingest(&db, &user, sensor.id, Reading { value: 80.0, timestamp: None })
        .await
        .unwrap();
    assert!(again.alert_triggered());
    assert_eq!(store::alerts::count_open_owned(&db, user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn other_users_sensor_is_not_found() {
    let db = setup_db().await;
    let owner = create_user(&db, "john", "key_john").await;
    let intruder = create_user(&db, "eve", "key_eve").await;
    let parcel = create_parcel(&db, &owner, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;

    let result = ingest::ingest(&db, &intruder, sensor.id, Reading { value: 1.0, timestamp: None }).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let unknown = ingest::ingest(&db, &owner, 9999, Reading { value: 1.0, timestamp: None }).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    // Nothing was written for the rejected reading
    assert!(store::readings::latest(&db, sensor.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unique_index_rejects_a_second_open_alert() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;

    let new_alert = || NewAlert {
        sensor_id: sensor.id,
        message: "Low soil_humidity detected: 1.00 (Threshold: 10)".to_string(),
        level: AlertLevel::Warning,
        created_at: at(2024, 1, 1, 0, 0, 0),
    };

    let created = store::alerts::insert_open(&db, new_alert()).await.unwrap();
    assert!(created.is_some());

    // Simulates the loser of a concurrent check-then-insert
    let duplicate = store::alerts::insert_open(&db, new_alert()).await.unwrap();
    assert!(duplicate.is_none());
    assert_eq!(store::alerts::count_open_owned(&db, user.id).await.unwrap(), 1);
}
