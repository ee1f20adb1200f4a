// ============================
// crates/client-lib/tests/notification_tests.rs
// ============================
//! Live notification listener against a stub WebSocket endpoint.
mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use common::serve;
use nutriplan_client::{error::ClientError, notifications::NotificationListener};
use tokio::sync::Notify;
use tokio::time::timeout;

async fn announce(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        for text in ["Nueva dieta publicada", "Dieta actualizada"] {
            if socket.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = socket.send(Message::Close(None)).await;
    })
}

#[tokio::test]
async fn test_text_frames_are_forwarded_in_order() {
    let addr = serve(Router::new().route("/ws", get(announce))).await;
    let mut listener = NotificationListener::connect(&format!("ws://{addr}/ws"))
        .await
        .unwrap();

    let first = timeout(Duration::from_secs(5), listener.next()).await.unwrap();
    let second = timeout(Duration::from_secs(5), listener.next()).await.unwrap();
    assert_eq!(first.as_deref(), Some("Nueva dieta publicada"));
    assert_eq!(second.as_deref(), Some("Dieta actualizada"));

    // the server closed the socket
    assert_eq!(timeout(Duration::from_secs(5), listener.next()).await.unwrap(), None);
    assert_eq!(listener.history().len(), 2);
    assert_eq!(listener.latest().as_deref(), Some("Dieta actualizada"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_connection_error() {
    let result = NotificationListener::connect("ws://127.0.0.1:1/ws").await;
    assert!(matches!(result, Err(ClientError::Connection(_))));
}

#[tokio::test]
async fn test_close_drops_the_socket() {
    let closed = Arc::new(Notify::new());
    let seen_close = closed.clone();
    let router = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| {
            let closed = seen_close.clone();
            async move {
                ws.on_upgrade(move |mut socket: WebSocket| async move {
                    let _ = socket.send(Message::Text("hola".into())).await;
                    while let Some(Ok(_)) = socket.recv().await {}
                    closed.notify_one();
                })
            }
        }),
    );
    let addr = serve(router).await;

    let mut listener = NotificationListener::connect(&format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let first = timeout(Duration::from_secs(5), listener.next()).await.unwrap();
    assert_eq!(first.as_deref(), Some("hola"));

    listener.close();
    timeout(Duration::from_secs(5), closed.notified()).await.unwrap();
}
