mod common;

use agrotech_api::entity::alerts::AlertStatus;
use agrotech_api::services::alerts;
use agrotech_api::services::ingest::{self, Reading};

use common::{at, create_parcel, create_sensor, create_user, setup_db};

async fn breach(db: &sea_orm::DatabaseConnection, user: &agrotech_api::auth::CurrentUser, sensor_id: i32, hour: u32) -> i32 {
    let outcome = ingest::ingest(
        db,
        user,
        sensor_id,
        Reading {
            value: 1.0,
            timestamp: Some(at(2024, 2, 1, hour, 0, 0)),
        },
    )
    .await
    .unwrap();
    outcome.alert.unwrap().id
}

#[tokio::test]
async fn resolve_after_acknowledge_matches_direct_resolve() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let a = create_sensor(&db, parcel.id, "A", 10.0, 50.0).await;
    let b = create_sensor(&db, parcel.id, "B", 10.0, 50.0).await;

    let first = breach(&db, &user, a.id, 1).await;
    let second = breach(&db, &user, b.id, 2).await;

    assert_eq!(
        alerts::acknowledge(&db, &user, first).await.unwrap(),
        Some(AlertStatus::Acknowledged)
    );
    assert_eq!(
        alerts::resolve(&db, &user, first).await.unwrap(),
        Some(AlertStatus::Resolved)
    );
    assert_eq!(
        alerts::resolve(&db, &user, second).await.unwrap(),
        Some(AlertStatus::Resolved)
    );

    // Repeating either transition changes nothing
    assert_eq!(
        alerts::acknowledge(&db, &user, first).await.unwrap(),
        Some(AlertStatus::Resolved)
    );

    let history = alerts::list_history(&db, &user, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|a| a.status == AlertStatus::Resolved));
    assert!(alerts::list_active(&db, &user).await.unwrap().is_empty());
}

#[tokio::test]
async fn listings_are_scoped_and_ordered_newest_first() {
    let db = setup_db().await;
    let john = create_user(&db, "john", "key_john").await;
    let sarah = create_user(&db, "sarah", "key_sarah").await;
    let johns = create_parcel(&db, &john, "North Field").await;
    let sarahs = create_parcel(&db, &sarah, "River Bank").await;

    let a = create_sensor(&db, johns.id, "A", 10.0, 50.0).await;
    let b = create_sensor(&db, johns.id, "B", 10.0, 50.0).await;
    let c = create_sensor(&db, sarahs.id, "C", 10.0, 50.0).await;

    let older = breach(&db, &john, a.id, 3).await;
    let newer = breach(&db, &john, b.id, 5).await;
    let foreign = breach(&db, &sarah, c.id, 4).await;

    let active = alerts::list_active(&db, &john).await.unwrap();
    let ids: Vec<i32> = active.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![newer, older]);
    assert_eq!(active[0].sensor, "B");
    assert_eq!(active[0].parcel, "North Field");
    assert_eq!(active[0].status, AlertStatus::Open);

    // Someone else's alert is a silent no-op
    assert_eq!(alerts::acknowledge(&db, &john, foreign).await.unwrap(), None);
    assert_eq!(alerts::resolve(&db, &john, 4242).await.unwrap(), None);
    assert_eq!(alerts::list_active(&db, &sarah).await.unwrap().len(), 1);

    alerts::acknowledge(&db, &john, older).await.unwrap();
    let history = alerts::list_history(&db, &john, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, AlertStatus::Acknowledged);
}

#[tokio::test]
async fn history_respects_the_limit() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "A", 10.0, 50.0).await;

    for hour in 0..4 {
        let id = breach(&db, &user, sensor.id, hour).await;
        alerts::resolve(&db, &user, id).await.unwrap();
    }

    let history = alerts::list_history(&db, &user, Some(3)).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].created_at, at(2024, 2, 1, 3, 0, 0));
}
