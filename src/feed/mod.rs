//! Push-feed boundary: payload decoding, connection state and the
//! websocket consumer.

pub mod client;
pub mod message;

use crate::model::Vehicle;

pub use client::FeedClient;
pub use message::{FeedEnvelope, FeedMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

/// What the feed consumer hands to the confirmation loop.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    State(ConnectionState),
    Snapshot(Vec<Vehicle>),
}
