use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_util::sync::CancellationToken;

use crate::backend::SharedBackend;
use crate::error::Result;
use crate::feed::FeedEnvelope;

const UPDATE_CAPACITY: usize = 16;

/// Fans position updates out to every connected feed socket.
#[derive(Clone)]
pub struct FeedHub {
    state: SharedBackend,
    updates: broadcast::Sender<String>,
    shutdown: CancellationToken,
}

impl FeedHub {
    /// Sockets served by this hub close when `shutdown` fires.
    pub fn new(state: SharedBackend, shutdown: CancellationToken) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            state,
            updates,
            shutdown,
        }
    }

    /// Current vehicles as an `update` envelope.
    pub async fn snapshot(&self) -> Result<String> {
        let vehicles = self.state.read().await.vehicles().to_vec();
        FeedEnvelope::update(vehicles).encode()
    }

    /// Move vehicles once and broadcast the result. Returns how many sockets
    /// received it.
    pub async fn tick(&self, jitter: f64) -> Result<usize> {
        let text = {
            let mut state = self.state.write().await;
            state.jitter_positions(&mut rand::thread_rng(), jitter);
            FeedEnvelope::update(state.vehicles().to_vec()).encode()?
        };
        Ok(self.updates.send(text).unwrap_or(0))
    }

    pub fn subscribers(&self) -> usize {
        self.updates.receiver_count()
    }
}

pub fn router(hub: FeedHub) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(hub)
}

/// Broadcast an update every `interval` until cancelled.
pub async fn run_ticker(hub: FeedHub, interval: Duration, jitter: f64, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // the first tick completes immediately; connects already get a snapshot
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match hub.tick(jitter).await {
                    Ok(sent) => tracing::trace!(sent, "Feed update broadcast"),
                    Err(e) => tracing::error!(error = %e, "Failed to encode feed update"),
                }
            }
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<FeedHub>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: FeedHub) {
    // subscribe before the snapshot so no tick falls between them
    let mut updates = BroadcastStream::new(hub.updates.subscribe());
    let (mut sink, mut incoming) = socket.split();

    let initial = match hub.snapshot().await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode initial feed snapshot");
            return;
        }
    };
    if sink.send(Message::Text(initial)).await.is_err() {
        return;
    }
    tracing::info!("Feed client connected");

    loop {
        tokio::select! {
            _ = hub.shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            frame = incoming.next() => match frame {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            },
            update = updates.next() => match update {
                Some(Ok(text)) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::debug!(skipped, "Feed client lagged, skipping updates");
                }
                None => break,
            },
        }
    }

    tracing::info!("Feed client disconnected");
}
