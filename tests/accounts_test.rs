mod common;

use agrotech_api::auth;
use agrotech_api::entity::users::Role;
use agrotech_api::error::AppError;
use agrotech_api::services::accounts::{self, PasswordChange, Registration};

use common::setup_db;

fn registration(email: &str) -> Registration {
    Registration {
        username: "farmer_john".to_string(),
        email: email.to_string(),
        password: "password123".to_string(),
        role: Role::Farmer,
    }
}

#[tokio::test]
async fn registered_user_can_log_in_and_authenticate() {
    let db = setup_db().await;
    let user = accounts::register(&db, registration("john@agrotech.com"))
        .await
        .unwrap();
    let api_key = user.api_key.clone().unwrap();
    assert!(api_key.starts_with("key_"));
    assert_ne!(user.password_hash, "password123");

    let verified = accounts::verify_credentials(&db, "john@agrotech.com", "password123")
        .await
        .unwrap();
    assert_eq!(verified.id, user.id);
    assert!(matches!(
        accounts::verify_credentials(&db, "john@agrotech.com", "wrong").await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        accounts::verify_credentials(&db, "nobody@agrotech.com", "password123").await,
        Err(AppError::Unauthorized(_))
    ));

    let current = auth::authenticate(&db, &api_key).await.unwrap();
    assert_eq!(current.username, "farmer_john");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let db = setup_db().await;
    accounts::register(&db, registration("john@agrotech.com"))
        .await
        .unwrap();
    let again = accounts::register(&db, registration("john@agrotech.com")).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn regenerated_key_replaces_the_old_one() {
    let db = setup_db().await;
    let user = accounts::register(&db, registration("john@agrotech.com"))
        .await
        .unwrap();
    let old_key = user.api_key.unwrap();
    let current = auth::authenticate(&db, &old_key).await.unwrap();

    let new_key = accounts::regenerate_api_key(&db, &current).await.unwrap();
    assert_ne!(new_key, old_key);
    assert!(matches!(
        auth::authenticate(&db, &old_key).await,
        Err(AppError::Unauthorized(_))
    ));
    assert_eq!(auth::authenticate(&db, &new_key).await.unwrap().id, current.id);
}

#[tokio::test]
async fn password_change_requires_matching_confirmation() {
    let db = setup_db().await;
    let user = accounts::register(&db, registration("john@agrotech.com"))
        .await
        .unwrap();
    let current = auth::authenticate(&db, user.api_key.as_deref().unwrap())
        .await
        .unwrap();

    let mismatch = accounts::update_password(
        &db,
        &current,
        PasswordChange {
            new_password: "newpassword1".to_string(),
            confirm_password: "newpassword2".to_string(),
        },
    )
    .await;
    assert!(matches!(mismatch, Err(AppError::BadRequest(_))));

    accounts::update_password(
        &db,
        &current,
        PasswordChange {
            new_password: "newpassword1".to_string(),
            confirm_password: "newpassword1".to_string(),
        },
    )
    .await
    .unwrap();

    assert!(accounts::verify_credentials(&db, "john@agrotech.com", "newpassword1")
        .await
        .is_ok());
}
