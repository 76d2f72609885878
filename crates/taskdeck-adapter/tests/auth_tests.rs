/*
[INPUT]:  Mock authentication responses
[OUTPUT]: Test results for auth flow
[POS]:    Integration tests - authentication
[UPDATE]: When auth endpoints or flow changes
*/

mod common;

use chrono::{Duration, Utc};
use common::{API_KEY, client_for, setup_mock_server, task_row, temp_dir, token_body};
use serde_json::json;
use taskdeck_adapter::{AuthClient, AuthEvent, BackendError, Session, SessionStore, TaskTable, User};
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn expired_session() -> Session {
    Session {
        access_token: "stale".to_string(),
        refresh_token: "refresh-stale".to_string(),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() - Duration::minutes(5),
        user: User {
            id: uuid::Uuid::new_v4(),
            email: Some("ada@example.com".to_string()),
            user_metadata: serde_json::Map::new(),
        },
    }
}

#[tokio::test]
async fn test_sign_in_authorizes_data_requests() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", API_KEY))
        .and(body_partial_json(json!({"email": "ada@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_row(1, "a")])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client_for(&server);
    let auth = AuthClient::new(backend.clone());
    let mut changes = auth.on_auth_state_change();

    let session = assert_ok!(auth.sign_in_with_password("ada@example.com", "pw").await);
    assert_eq!(session.email(), Some("ada@example.com"));
    assert_eq!(auth.access_token().as_deref(), Some("at-1"));

    let change = changes.recv().await.expect("sign-in notification");
    assert_eq!(change.event, AuthEvent::SignedIn);
    assert_eq!(change.session, Some(session));

    let tasks = assert_ok!(TaskTable::new(backend, "tasks").list().await);
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn test_sign_in_rejected_credentials() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let auth = AuthClient::new(client_for(&server));
    let err = auth
        .sign_in_with_password("ada@example.com", "nope")
        .await
        .expect_err("sign-in should fail");

    match err {
        BackendError::Api { code, message } => {
            assert_eq!(code, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(auth.access_token().is_none());
}

#[tokio::test]
async fn test_sign_up_sends_display_name() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(json!({
            "email": "ada@example.com",
            "data": {"name": "Ada"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-2", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthClient::new(client_for(&server));
    let session = assert_ok!(auth.sign_up("ada@example.com", "pw", "Ada").await).expect("session");
    assert_eq!(session.user.display_name(), Some("Ada"));
    assert_eq!(auth.access_token().as_deref(), Some("at-2"));
}

#[tokio::test]
async fn test_sign_up_awaiting_confirmation_has_no_session() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": common::USER_ID,
            "email": "ada@example.com",
            "confirmation_sent_at": "2024-05-01T10:00:00Z",
            "user_metadata": {"name": "Ada"}
        })))
        .mount(&server)
        .await;

    let auth = AuthClient::new(client_for(&server));
    let outcome = assert_ok!(auth.sign_up("ada@example.com", "pw", "Ada").await);
    assert!(outcome.is_none());
    assert!(auth.access_token().is_none());
}

#[tokio::test]
async fn test_session_persists_across_clients() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-3", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = temp_dir();
    let store = SessionStore::new(dir.join("session.json"));

    let first = AuthClient::with_store(client_for(&server), store.clone());
    assert_ok!(first.sign_in_with_password("ada@example.com", "pw").await);

    let second = AuthClient::with_store(client_for(&server), store);
    let restored = assert_ok!(second.get_session().await).expect("restored session");
    assert_eq!(restored.access_token, "at-3");
    assert_eq!(second.access_token().as_deref(), Some("at-3"));

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn test_expired_session_is_refreshed() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_partial_json(json!({"refresh_token": "refresh-stale"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = temp_dir();
    let store = SessionStore::new(dir.join("session.json"));
    assert_ok!(store.save(&expired_session()));

    let auth = AuthClient::with_store(client_for(&server), store.clone());
    let mut changes = auth.on_auth_state_change();

    let session = assert_ok!(auth.get_session().await).expect("refreshed session");
    assert_eq!(session.access_token, "fresh");
    assert_eq!(changes.recv().await.map(|c| c.event), Some(AuthEvent::TokenRefreshed));

    let on_disk = assert_ok!(store.load()).expect("stored");
    assert_eq!(on_disk.access_token, "fresh");

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn test_failed_refresh_signs_out_locally() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_description": "Invalid Refresh Token"
        })))
        .mount(&server)
        .await;

    let dir = temp_dir();
    let store = SessionStore::new(dir.join("session.json"));
    assert_ok!(store.save(&expired_session()));

    let auth = AuthClient::with_store(client_for(&server), store.clone());
    let mut changes = auth.on_auth_state_change();

    assert!(assert_ok!(auth.get_session().await).is_none());
    assert_eq!(changes.recv().await.map(|c| c.event), Some(AuthEvent::SignedOut));
    assert!(assert_ok!(store.load()).is_none());

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn test_sign_out_clears_session_even_if_token_rejected() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-4", 3600)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer at-4"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "invalid JWT"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = temp_dir();
    let store = SessionStore::new(dir.join("session.json"));
    let auth = AuthClient::with_store(client_for(&server), store.clone());
    assert_ok!(auth.sign_in_with_password("ada@example.com", "pw").await);
    let mut changes = auth.on_auth_state_change();

    assert_ok!(auth.sign_out().await);
    assert!(auth.access_token().is_none());
    assert!(assert_ok!(store.load()).is_none());
    assert_eq!(changes.recv().await.map(|c| c.event), Some(AuthEvent::SignedOut));

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn test_sign_out_keeps_session_on_server_error() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-5", 3600)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let auth = AuthClient::new(client_for(&server));
    assert_ok!(auth.sign_in_with_password("ada@example.com", "pw").await);

    assert!(auth.sign_out().await.is_err());
    assert_eq!(auth.access_token().as_deref(), Some("at-5"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_data_request() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 5)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_partial_json(json!({"refresh_token": "refresh-short"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("renewed", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(header("authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_row(1, "a")])))
        .expect(2)
        .mount(&server)
        .await;

    let backend = client_for(&server);
    let auth = AuthClient::new(backend.clone());
    let table = TaskTable::new(backend, "tasks");

    assert_ok!(auth.sign_in_with_password("ada@example.com", "pw").await);
    let mut changes = auth.on_auth_state_change();

    assert_eq!(assert_ok!(table.list().await).len(), 1);
    assert_eq!(auth.access_token().as_deref(), Some("renewed"));
    assert_eq!(changes.recv().await.map(|c| c.event), Some(AuthEvent::TokenRefreshed));

    // The renewed token is reused without another refresh.
    assert_ok!(table.list().await);
}

#[tokio::test]
async fn test_rejected_refresh_during_request_signs_out() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 5)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_description": "Invalid Refresh Token"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "JWT required"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client_for(&server);
    let auth = AuthClient::new(backend.clone());
    let table = TaskTable::new(backend, "tasks");

    assert_ok!(auth.sign_in_with_password("ada@example.com", "pw").await);
    let mut changes = auth.on_auth_state_change();

    let err = table.list().await.expect_err("signed out request is rejected");
    assert!(err.is_auth_error());
    assert!(auth.access_token().is_none());
    assert_eq!(changes.recv().await.map(|c| c.event), Some(AuthEvent::SignedOut));
}
