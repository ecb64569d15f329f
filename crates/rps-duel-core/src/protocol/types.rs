//! Protocol types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest room identifier the relay accepts
pub const MAX_ROOM_ID_LEN: usize = 128;

/// Room identifier shared by the two players, taken from the page URL
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

/// Returned for empty or oversized room identifiers
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid room id")]
pub struct InvalidRoomId;

impl RoomId {
    /// Non-empty and at most [`MAX_ROOM_ID_LEN`] bytes
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty() && self.0.len() <= MAX_ROOM_ID_LEN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomId {
    type Err = InvalidRoomId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self(s.to_string());
        if id.is_valid() {
            Ok(id)
        } else {
            Err(InvalidRoomId)
        }
    }
}

impl fmt::Debug for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
