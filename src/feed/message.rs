use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Vehicle;

/// Enveloped feed payload, `{"type":"update","vehicles":[...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedEnvelope {
    Update { vehicles: Vec<Vehicle> },
}

/// Any payload shape the feed may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeedMessage {
    Bare(Vec<Vehicle>),
    Envelope(FeedEnvelope),
}

impl FeedMessage {
    /// Decode one text frame. Unknown envelopes and malformed JSON are errors.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_vehicles(self) -> Vec<Vehicle> {
        match self {
            FeedMessage::Bare(vehicles) => vehicles,
            FeedMessage::Envelope(FeedEnvelope::Update { vehicles }) => vehicles,
        }
    }
}

impl FeedEnvelope {
    pub fn update(vehicles: Vec<Vehicle>) -> Self {
        FeedEnvelope::Update { vehicles }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
