//! Protocol messages.
//!
//! Two families travel as JSON objects tagged by `type`:
//! relay messages between a client and the rendezvous relay, and peer
//! messages on the direct channel between the two players.

use crate::crypto::{MoveKey, SealedMove};
use crate::protocol::RoomId;
use serde::{Deserialize, Serialize};

/// Client → relay
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayRequest {
    Join {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    /// Opaque payload for the other room member
    Signal { data: serde_json::Value },
}

/// Relay → client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayEvent {
    /// Join accepted; `id` is the 1-based arrival position
    Joined { id: usize },
    /// Room has two members
    Ready { initiator: bool },
    Error { message: String },
    Signal { data: serde_json::Value },
    /// The other member disconnected
    Left,
}

/// Player ↔ player on the direct channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PeerMessage {
    /// Commitment for the current round
    Move(SealedMove),
    /// Disclosed key for the current round
    Key(MoveKey),
    /// Intent to start a new match
    Rematch,
}

impl RelayRequest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl RelayEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
