mod common;

use axum::http::StatusCode;
use mongodb::bson::oid::ObjectId;

use media_vault::{
    dto::{
        auth::{LoginRequest, RegisterRequest},
        user::{ChangePasswordRequest, UpdateAccountRequest},
    },
    repositories::UserRepository,
    services::auth::AuthService,
};

use common::{cleanup, local_file, register_request, register_user, setup_test_app, PASSWORD};

fn login_as(username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        username: Some(username.to_string()),
        email: None,
        password: Some(password.to_string()),
    }
}

#[tokio::test]
async fn test_register_normalizes_and_hides_secrets() {
    let app = setup_test_app();

    let mut request = register_request("Alice");
    request.email = Some("  Alice@Example.COM ".to_string());
    let user = app.state.user_service.register(request).await.unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert!(user.avatar.is_none());

    let stored = app
        .users
        .find_by_id(&ObjectId::parse_str(&user.id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.password_hash, PASSWORD);
    assert!(stored.refresh_token.is_none());

    cleanup(&app).await;
}

#[tokio::test]
async fn test_register_rejects_bad_input_and_duplicates() {
    let app = setup_test_app();
    let service = &app.state.user_service;
    register_user(&app, "alice").await;

    let missing = service
        .register(RegisterRequest {
            username: Some("bob".to_string()),
            ..RegisterRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.to_string(), "All fields are required");

    let mut short_password = register_request("carol");
    short_password.password = Some("short".to_string());
    assert_eq!(
        service.register(short_password).await.unwrap_err().status(),
        StatusCode::BAD_REQUEST
    );

    let mut bad_email = register_request("dave");
    bad_email.email = Some("not-an-email".to_string());
    assert_eq!(
        service.register(bad_email).await.unwrap_err().status(),
        StatusCode::BAD_REQUEST
    );

    let duplicate = service.register(register_request("ALICE")).await.unwrap_err();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(app.users.len().await, 1);

    cleanup(&app).await;
}

#[tokio::test]
async fn test_login_issues_tokens_and_stores_refresh_token() {
    let app = setup_test_app();
    let id = register_user(&app, "alice").await;

    let session = app
        .state
        .user_service
        .login(login_as("alice", PASSWORD))
        .await
        .unwrap();

    let claims = app
        .state
        .auth
        .validate_access_token(&session.access_token)
        .unwrap();
    assert_eq!(AuthService::subject_id(&claims).unwrap(), id);
    assert_eq!(session.user.username, "alice");

    let stored = app.users.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(session.refresh_token.as_str()));

    // Login by email works too.
    let by_email = LoginRequest {
        username: None,
        email: Some("ALICE@example.com".to_string()),
        password: Some(PASSWORD.to_string()),
    };
    assert!(app.state.user_service.login(by_email).await.is_ok());

    cleanup(&app).await;
}

#[tokio::test]
async fn test_login_failures() {
    let app = setup_test_app();
    register_user(&app, "alice").await;
    let service = &app.state.user_service;

    let wrong = service.login(login_as("alice", "wrong-password")).await.unwrap_err();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.to_string(), "Invalid user credentials");

    let unknown = service.login(login_as("nobody", PASSWORD)).await.unwrap_err();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let missing = service.login(LoginRequest::default()).await.unwrap_err();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    cleanup(&app).await;
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_reuse() {
    let app = setup_test_app();
    register_user(&app, "alice").await;
    let service = &app.state.user_service;

    let session = service.login(login_as("alice", PASSWORD)).await.unwrap();
    let rotated = service
        .refresh_access_token(Some(&session.refresh_token))
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, session.refresh_token);

    let reused = service
        .refresh_access_token(Some(&session.refresh_token))
        .await
        .unwrap_err();
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(reused.to_string(), "Refresh token is expired or used");

    // An access token is not a refresh token.
    let wrong_kind = service
        .refresh_access_token(Some(&rotated.access_token))
        .await
        .unwrap_err();
    assert_eq!(wrong_kind.status(), StatusCode::UNAUTHORIZED);

    let missing = service.refresh_access_token(None).await.unwrap_err();
    assert_eq!(missing.to_string(), "Unauthorized request");

    cleanup(&app).await;
}

#[tokio::test]
async fn test_logout_invalidates_refresh_token() {
    let app = setup_test_app();
    let id = register_user(&app, "alice").await;
    let service = &app.state.user_service;

    let session = service.login(login_as("alice", PASSWORD)).await.unwrap();
    service.logout(&id).await.unwrap();

    let stored = app.users.find_by_id(&id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());

    let err = service
        .refresh_access_token(Some(&session.refresh_token))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

    cleanup(&app).await;
}

#[tokio::test]
async fn test_change_password() {
    let app = setup_test_app();
    let id = register_user(&app, "alice").await;
    let service = &app.state.user_service;

    let wrong_old = service
        .change_current_password(
            &id,
            ChangePasswordRequest {
                old_password: Some("not-my-password".to_string()),
                new_password: Some("brand-new-password".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(wrong_old.status(), StatusCode::BAD_REQUEST);
    assert_eq!(wrong_old.to_string(), "Invalid old password");

    service
        .change_current_password(
            &id,
            ChangePasswordRequest {
                old_password: Some(PASSWORD.to_string()),
                new_password: Some("brand-new-password".to_string()),
            },
        )
        .await
        .unwrap();

    assert!(service.login(login_as("alice", PASSWORD)).await.is_err());
    assert!(service
        .login(login_as("alice", "brand-new-password"))
        .await
        .is_ok());

    cleanup(&app).await;
}

#[tokio::test]
async fn test_update_account_details() {
    let app = setup_test_app();
    let alice = register_user(&app, "alice").await;
    register_user(&app, "bob").await;
    let service = &app.state.user_service;

    let updated = service
        .update_account_details(
            &alice,
            UpdateAccountRequest {
                full_name: Some("Alice Liddell".to_string()),
                email: Some("Liddell@Example.com".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name, "Alice Liddell");
    assert_eq!(updated.email, "liddell@example.com");

    let taken = service
        .update_account_details(
            &alice,
            UpdateAccountRequest {
                full_name: Some("Alice".to_string()),
                email: Some("bob@example.com".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(taken.status(), StatusCode::CONFLICT);

    let incomplete = service
        .update_account_details(&alice, UpdateAccountRequest::default())
        .await
        .unwrap_err();
    assert_eq!(incomplete.status(), StatusCode::BAD_REQUEST);

    let current = service.get_current_user(&alice).await.unwrap();
    assert_eq!(current.email, "liddell@example.com");

    cleanup(&app).await;
}

#[tokio::test]
async fn test_avatar_replacement_removes_previous_asset() {
    let app = setup_test_app();
    let id = register_user(&app, "alice").await;
    let service = &app.state.user_service;

    let missing = service.update_user_avatar(&id, None).await.unwrap_err();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.to_string(), "Avatar file is missing");

    let first = local_file(&app, "me.png", b"first").await;
    let with_first = service.update_user_avatar(&id, Some(first)).await.unwrap();
    assert!(with_first.avatar.is_some());
    assert!(app.media.destroys().is_empty());

    let second = local_file(&app, "me2.png", b"second").await;
    let with_second = service.update_user_avatar(&id, Some(second)).await.unwrap();
    assert_ne!(with_first.avatar, with_second.avatar);

    let uploads = app.media.uploads();
    assert_eq!(app.media.destroys(), vec![uploads[0].clone()]);

    cleanup(&app).await;
}
