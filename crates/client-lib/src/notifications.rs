// ============================
// crates/client-lib/src/notifications.rs
// ============================
//! Live notifications pushed by the backend over a WebSocket.
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::ClientError;

const CHANNEL_CAPACITY: usize = 64;

/// Receives text notifications until dropped
pub struct NotificationListener {
    rx: mpsc::Receiver<String>,
    history: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl NotificationListener {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (mut stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(format!("notifications: {e}")))?;
        info!(url, "notification socket connected");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let history = Arc::new(Mutex::new(Vec::new()));
        let seen = history.clone();

        let task = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let text = text.as_str().to_string();
                        debug!(%text, "notification received");
                        seen.lock().push(text.clone());
                        if tx.send(text).await.is_err() {
                            break;
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {},
                    Err(e) => {
                        warn!(error = %e, "notification socket error");
                        break;
                    },
                }
            }
            info!("notification socket closed");
        });

        Ok(Self { rx, history, task })
    }

    /// Next notification, or `None` once the socket has closed
    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Every notification received so far, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn latest(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }

    /// Stop reading from the socket. Dropping the listener does the same.
    pub fn close(self) {
        self.task.abort();
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
