// ============================
// crates/client-lib/tests/identity_tests.rs
// ============================
//! Identity-provider backend against a stub of its REST API.
mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use common::{memory_storage, serve};
use nutriplan_client::{
    auth::{AuthBackend, IdentityBackend, SessionStore},
    config::IdentitySettings,
    error::ClientError,
    storage::keys,
};
use nutriplan_common::Session;
use serde_json::{json, Value};
use tokio::time::timeout;

fn provider_error(code: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": { "code": 400, "message": code } })),
    )
        .into_response()
}

async fn sign_in(Json(body): Json<Value>) -> axum::response::Response {
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("ana@example.com"), Some("secret1")) => Json(json!({
            "localId": "fb-1",
            "email": "ana@example.com",
            "displayName": "Ana",
            "idToken": "tok-1"
        }))
        .into_response(),
        (Some("noname@example.com"), Some("secret1")) => Json(json!({
            "localId": "fb-3",
            "email": "noname@example.com",
            "displayName": "",
            "idToken": "tok-3"
        }))
        .into_response(),
        (Some("blocked@example.com"), _) => provider_error("TOO_MANY_ATTEMPTS_TRY_LATER"),
        _ => provider_error("INVALID_LOGIN_CREDENTIALS"),
    }
}

async fn sign_up(Json(body): Json<Value>) -> axum::response::Response {
    if body["email"] == "ana@example.com" {
        return provider_error("EMAIL_EXISTS");
    }
    Json(json!({ "localId": "fb-2", "email": body["email"], "idToken": "tok-2" })).into_response()
}

async fn update(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "localId": "fb-2", "displayName": body["displayName"] }))
}

async fn identity_settings() -> IdentitySettings {
    let router = Router::new()
        .route("/v1/accounts:signInWithPassword", post(sign_in))
        .route("/v1/accounts:signUp", post(sign_up))
        .route("/v1/accounts:update", post(update));
    let addr = serve(router).await;
    IdentitySettings {
        endpoint: format!("http://{addr}"),
        api_key: "test-key".to_string(),
    }
}

#[tokio::test]
async fn test_sign_in_and_error_codes() {
    let backend = IdentityBackend::new(identity_settings().await, memory_storage()).unwrap();

    let session = backend.login("ana@example.com", "secret1").await.unwrap();
    assert_eq!(session, Session::new("fb-1", "Ana", "ana@example.com"));

    let nameless = backend.login("noname@example.com", "secret1").await.unwrap();
    assert_eq!(nameless.display_name, "noname@example.com");

    assert!(matches!(
        backend.login("ana@example.com", "wrong").await,
        Err(ClientError::InvalidCredentials)
    ));
    assert!(matches!(
        backend.login("blocked@example.com", "x").await,
        Err(ClientError::Backend { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_register_sets_display_name() {
    let backend = IdentityBackend::new(identity_settings().await, memory_storage()).unwrap();

    let session = backend
        .register("luis@example.com", "secret1", Some("Luis"))
        .await
        .unwrap();
    assert_eq!(session, Session::new("fb-2", "Luis", "luis@example.com"));

    match backend.register("ana@example.com", "secret1", None).await {
        Err(ClientError::RegistrationFailed(code)) => assert_eq!(code, "EMAIL_EXISTS"),
        other => panic!("expected RegistrationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_session_changes_are_pushed() {
    let storage = memory_storage();
    let backend = Arc::new(IdentityBackend::new(identity_settings().await, storage.clone()).unwrap());
    let sessions = SessionStore::new(backend.clone(), storage.clone());
    let mut rx = sessions.subscribe();

    sessions.restore_from_backend().await;
    let state = timeout(Duration::from_secs(5), sessions.wait_resolved())
        .await
        .unwrap();
    assert!(state.session.is_none());

    // signing in through the backend directly still reaches the store
    backend.login("ana@example.com", "secret1").await.unwrap();
    let pushed = timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.session.is_some()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(pushed.session.map(|s| s.id), Some("fb-1".to_string()));
    assert!(storage.get(keys::IDENTITY_USER).unwrap().is_some());

    backend.logout().await.unwrap();
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.session.is_none()))
        .await
        .unwrap()
        .unwrap();
    assert!(sessions.current().is_none());
    assert!(storage.get(keys::IDENTITY_USER).unwrap().is_none());
}

#[tokio::test]
async fn test_user_is_restored_on_restart() {
    let storage = memory_storage();
    let settings = identity_settings().await;
    let first = IdentityBackend::new(settings.clone(), storage.clone()).unwrap();
    first.login("ana@example.com", "secret1").await.unwrap();
    drop(first);

    let second = IdentityBackend::new(settings, storage).unwrap();
    assert_eq!(second.current_user().map(|s| s.id), Some("fb-1".to_string()));
}

#[tokio::test]
async fn test_dropped_subscription_stops_notifications() {
    let backend = IdentityBackend::new(identity_settings().await, memory_storage()).unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let subscription = backend
        .observe_session(Arc::new(move |session| {
            let _ = tx.send(session);
        }))
        .await;
    assert_eq!(timeout(Duration::from_secs(5), rx.recv()).await.unwrap(), Some(None));
    assert!(subscription.is_active());

    subscription.unsubscribe();
    tokio::task::yield_now().await;
    backend.login("ana@example.com", "secret1").await.unwrap();

    // the sender lived in the aborted task, so the channel closes with nothing new
    assert_eq!(timeout(Duration::from_secs(5), rx.recv()).await.unwrap(), None);
}
