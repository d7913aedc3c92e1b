use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, Result};
use crate::feed::{ConnectionState, FeedEvent, FeedMessage};

/// Websocket consumer for the vehicle position feed.
///
/// Decoded snapshots and connection-state changes are forwarded as
/// [`FeedEvent`]s. Malformed frames are dropped. After any disconnect the
/// client waits a fixed delay and reconnects, until cancelled.
#[derive(Debug, Clone)]
pub struct FeedClient {
    url: String,
    reconnect_delay: Duration,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
        }
    }

    pub fn spawn(self, tx: mpsc::Sender<FeedEvent>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(tx, cancel).await })
    }

    pub async fn run(self, tx: mpsc::Sender<FeedEvent>, cancel: CancellationToken) {
        tracing::info!(url = %self.url, "Starting feed connection loop");

        loop {
            if tx
                .send(FeedEvent::State(ConnectionState::Connecting))
                .await
                .is_err()
            {
                break;
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.connect_once(&tx) => outcome,
            };

            let state = match outcome {
                Ok(()) => ConnectionState::Closed,
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "Feed connection failed");
                    ConnectionState::Error
                }
            };
            if tx.send(FeedEvent::State(state)).await.is_err() {
                break;
            }

            tracing::debug!(delay = ?self.reconnect_delay, "Reconnecting feed");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        let _ = tx.try_send(FeedEvent::State(ConnectionState::Closed));
        tracing::info!(url = %self.url, "Feed connection loop stopped");
    }

    /// One connection's lifetime. Returns `Ok` when the server closes cleanly.
    async fn connect_once(&self, tx: &mpsc::Sender<FeedEvent>) -> Result<()> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| DispatchError::Feed(e.to_string()))?;
        tx.send(FeedEvent::State(ConnectionState::Open))
            .await
            .map_err(|_| DispatchError::Feed("feed receiver dropped".to_string()))?;

        let (_sink, mut stream) = stream.split();
        while let Some(frame) = stream.next().await {
            let frame = frame.map_err(|e| DispatchError::Feed(e.to_string()))?;
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match FeedMessage::decode(&text) {
                Ok(message) => {
                    let vehicles = message.into_vehicles();
                    if tx.send(FeedEvent::Snapshot(vehicles)).await.is_err() {
                        return Err(DispatchError::Feed("feed receiver dropped".to_string()));
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring malformed feed message");
                }
            }
        }
        Ok(())
    }
}
