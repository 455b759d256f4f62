mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

use agrotech_api::store;

use common::{
    at, create_parcel, create_sensor, create_user, get, post_json, send, setup_db, test_app,
};

#[tokio::test]
async fn missing_or_unknown_api_key_is_unauthorized() {
    let db = setup_db().await;
    create_user(&db, "john", "key_john").await;
    let app = test_app(db);

    let (status, body) = send(&app, get("/api/parcels", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing API Key");

    let (status, body) = send(&app, get("/api/dashboard", Some("key_nobody"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid API Key");
}

#[tokio::test]
async fn health_needs_no_key() {
    let app = test_app(setup_db().await);
    let (status, _) = send(&app, get("/healthz", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ingest_reports_alert_only_when_one_is_opened() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;
    let app = test_app(db);
    let uri = format!("/api/sensors/{}/data", sensor.id);

    let (status, body) = send(
        &app,
        post_json(&uri, "key_john", r#"{"value": 5, "timestamp": "2024-01-01T08:00:00Z"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["alert_triggered"], true);

    let (_, body) = send(
        &app,
        post_json(&uri, "key_john", r#"{"value": 3, "timestamp": "2024-01-01T09:00:00"}"#),
    )
    .await;
    assert_eq!(body["alert_triggered"], false);

    let (status, body) = send(&app, get(&format!("{uri}?limit=1"), Some("key_john"))).await;
    assert_eq!(status, StatusCode::OK);
    let readings = body.as_array().unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0]["value"], 3.0);

    let (_, body) = send(&app, get("/api/dashboard", Some("key_john"))).await;
    assert_eq!(body["total_parcels"], 1);
    assert_eq!(body["total_sensors"], 1);
    assert_eq!(body["active_alerts"], 1);
}

#[tokio::test]
async fn malformed_readings_are_rejected() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;
    let app = test_app(db);
    let uri = format!("/api/sensors/{}/data", sensor.id);

    let (status, body) = send(&app, post_json(&uri, "key_john", r#"{"value": "wet"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        post_json(&uri, "key_john", r#"{"value": 1, "timestamp": "yesterday"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/api/sensors/9999/data", "key_john", r#"{"value": 1}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn parcels_of_other_users_are_invisible() {
    let db = setup_db().await;
    let john = create_user(&db, "john", "key_john").await;
    create_user(&db, "sarah", "key_sarah").await;
    let parcel = create_parcel(&db, &john, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;
    store::readings::insert(&db, sensor.id, 42.5, at(2024, 1, 1, 0, 0, 0))
        .await
        .unwrap();
    let app = test_app(db);
    let uri = format!("/api/parcels/{}/sensors", parcel.id);

    let (status, body) = send(&app, get(&uri, Some("key_john"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["type"], "soil_humidity");
    assert_eq!(body[0]["last_reading"], 42.5);

    let (status, _) = send(&app, get(&uri, Some("key_sarah"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/api/parcels/9999/sensors", Some("key_sarah"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, get("/api/parcels", Some("key_sarah"))).await;
    assert_eq!(body, serde_json::json!([]));
    let (status, _) = send(
        &app,
        get(&format!("/api/sensors/{}/data", sensor.id), Some("key_sarah")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn parcel_crud_validates_and_cascades() {
    let db = setup_db().await;
    create_user(&db, "john", "key_john").await;
    let app = test_app(db);

    let (status, _) = send(
        &app,
        post_json(
            "/api/parcels",
            "key_john",
            r#"{"name": "Field", "size": "big", "crop_type": "Corn", "location": "A"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/api/parcels",
            "key_john",
            r#"{"name": "Field", "size": 0, "crop_type": "Corn", "location": "A"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, parcel) = send(
        &app,
        post_json(
            "/api/parcels",
            "key_john",
            r#"{"name": "Field", "size": 4.5, "crop_type": "Corn", "location": "A"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let parcel_id = parcel["id"].as_i64().unwrap();

    let (status, sensor) = send(
        &app,
        post_json(
            &format!("/api/parcels/{parcel_id}/sensors"),
            "key_john",
            r#"{"name": "Probe", "sensor_type": "ph_level"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sensor["threshold_low"], 0.0);
    assert_eq!(sensor["threshold_high"], 100.0);
    assert_eq!(sensor["status"], "active");

    let sensor_id = sensor["id"].as_i64().unwrap();
    send(
        &app,
        post_json(&format!("/api/sensors/{sensor_id}/data"), "key_john", r#"{"value": 150}"#),
    )
    .await;

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/parcels/{parcel_id}"))
        .header("x-api-key", "key_john")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, get("/api/dashboard", Some("key_john"))).await;
    assert_eq!(body["total_parcels"], 0);
    assert_eq!(body["total_sensors"], 0);
    assert_eq!(body["active_alerts"], 0);
}

#[tokio::test]
async fn export_returns_a_named_csv_attachment() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Temp A", 0.0, 100.0).await;
    store::readings::insert_many(
        &db,
        vec![
            (sensor.id, 20.0, at(2024, 1, 1, 6, 0, 0)),
            (sensor.id, 22.0, at(2024, 1, 1, 18, 0, 0)),
        ],
    )
    .await
    .unwrap();
    let app = test_app(db);

    let uri = format!(
        "/api/analytics/export?format=csv&sensor_ids={}&start=2024-01-01&end=2024-01-03&granularity=day",
        sensor.id
    );
    let response = app.clone().oneshot(get(&uri, Some("key_john"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"sensor_data_2024-01-01_to_2024-01-03.csv\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv, "Timestamp,North Field - Temp A\n2024-01-01,21\n");

    let (status, body) = send(
        &app,
        get(
            "/api/analytics/export?format=json&start=2023-01-01&end=2023-01-02",
            Some("key_john"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data to export.");
}

#[tokio::test]
async fn analytics_rejects_an_end_date_past_the_calendar() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    create_sensor(&db, parcel.id, "Temp A", 0.0, 100.0).await;
    let app = test_app(db);

    let (status, body) = send(
        &app,
        get("/api/analytics?start=2024-01-01&end=%2B262142-12-31", Some("key_john")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End date out of range");
}

#[tokio::test]
async fn alert_endpoints_acknowledge_silently() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;
    let app = test_app(db);

    send(
        &app,
        post_json(&format!("/api/sensors/{}/data", sensor.id), "key_john", r#"{"value": 1}"#),
    )
    .await;

    let (_, active) = send(&app, get("/api/alerts/active", Some("key_john"))).await;
    let alert_id = active[0]["id"].as_i64().unwrap();
    assert_eq!(active[0]["status"], "open");

    let (status, _) = send(
        &app,
        post_json(&format!("/api/alerts/{alert_id}/acknowledge"), "key_john", ""),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, post_json("/api/alerts/9999/resolve", "key_john", "")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, history) = send(&app, get("/api/alerts/history", Some("key_john"))).await;
    assert_eq!(history[0]["status"], "acknowledged");
}

#[tokio::test]
async fn login_returns_the_current_api_key() {
    use agrotech_api::entity::users::Role;
    use agrotech_api::services::accounts::{self, Registration};

    let db = setup_db().await;
    let user = accounts::register(
        &db,
        Registration {
            username: "farmer_john".to_string(),
            email: "john@agrotech.com".to_string(),
            password: "password123".to_string(),
            role: Role::Farmer,
        },
    )
    .await
    .unwrap();
    let app = test_app(db);

    let login = |password: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/account/login")
            .header("content-type", "application/json")
            .body(Body::from(format!(
                r#"{{"email": "john@agrotech.com", "password": "{password}"}}"#
            )))
            .unwrap()
    };

    let (status, body) = send(&app, login("password123")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_key"].as_str(), user.api_key.as_deref());

    let (status, body) = send(&app, login("wrong-password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn sensor_update_reports_the_latest_reading() {
    let db = setup_db().await;
    let user = create_user(&db, "john", "key_john").await;
    let parcel = create_parcel(&db, &user, "North Field").await;
    let sensor = create_sensor(&db, parcel.id, "Humidity 1", 10.0, 50.0).await;
    let app = test_app(db);

    send(
        &app,
        post_json(
            &format!("/api/sensors/{}/data", sensor.id),
            "key_john",
            r#"{"value": 42, "timestamp": "2024-01-01T08:00:00Z"}"#,
        ),
    )
    .await;

    let update = Request::builder()
        .method("PUT")
        .uri(format!("/api/sensors/{}", sensor.id))
        .header("x-api-key", "key_john")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"threshold_high": 80}"#))
        .unwrap();
    let (status, body) = send(&app, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold_high"], 80.0);
    assert_eq!(body["last_reading"], 42.0);
    assert_eq!(body["last_update"], "2024-01-01T08:00:00Z");
}
