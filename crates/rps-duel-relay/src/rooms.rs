//! Room registry: pairs up to two connections per room id.

use rps_duel_core::protocol::{RelayEvent, RoomId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Members a room holds before further joins are refused
pub const ROOM_CAPACITY: usize = 2;

/// Relay connection id
pub type ConnectionId = Uuid;

/// Bounded queue feeding a connection's socket writer
pub type Outbox = mpsc::Sender<RelayEvent>;

/// Create an outbox holding at most `capacity` undelivered events
pub fn outbox(capacity: usize) -> (Outbox, mpsc::Receiver<RelayEvent>) {
    mpsc::channel(capacity.max(1))
}

/// Rendezvous failures, sent to the client as `error{message}`
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Room full")]
    RoomFull,

    #[error("Already joined")]
    AlreadyJoined,

    #[error("Invalid room id")]
    InvalidRoomId,

    #[error("Invalid message")]
    InvalidMessage,
}

impl RelayError {
    pub fn to_event(&self) -> RelayEvent {
        RelayEvent::Error {
            message: self.to_string(),
        }
    }
}

struct Member {
    id: ConnectionId,
    outbox: Outbox,
}

impl Member {
    /// Queue without waiting. A reader that falls behind loses the event
    /// instead of growing the queue.
    fn deliver(&self, event: RelayEvent) -> bool {
        match self.outbox.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection = %self.id, "outbox full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection = %self.id, "dropping event for closed connection");
                false
            }
        }
    }
}

/// Shared map of room id to members in arrival order
#[derive(Clone, Default)]
pub struct RoomRegistry {
    inner: Arc<Mutex<HashMap<RoomId, Vec<Member>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, reply `joined` with its 1-based ordinal,
    /// and send `ready` to both members once the room is complete
    pub fn join(&self, room: RoomId, id: ConnectionId, outbox: Outbox) -> Result<usize, RelayError> {
        if !room.is_valid() {
            return Err(RelayError::InvalidRoomId);
        }

        let mut rooms = self.inner.lock().unwrap();
        let members = rooms.entry(room.clone()).or_default();
        if members.iter().any(|m| m.id == id) {
            return Err(RelayError::AlreadyJoined);
        }
        if members.len() >= ROOM_CAPACITY {
            return Err(RelayError::RoomFull);
        }

        members.push(Member { id, outbox });
        let ordinal = members.len();
        members[ordinal - 1].deliver(RelayEvent::Joined { id: ordinal });
        info!(%room, connection = %id, ordinal, "joined room");

        if ordinal == ROOM_CAPACITY {
            for (index, member) in members.iter().enumerate() {
                member.deliver(RelayEvent::Ready {
                    initiator: index == 0,
                });
            }
            info!(%room, "room ready");
        }
        Ok(ordinal)
    }

    /// Forward a signal payload to the sender's room mate. False when there
    /// is no mate or its outbox refused the event.
    pub fn forward_signal(&self, room: &RoomId, from: ConnectionId, data: serde_json::Value) -> bool {
        let rooms = self.inner.lock().unwrap();
        let Some(peer) = rooms
            .get(room)
            .and_then(|members| members.iter().find(|m| m.id != from))
        else {
            debug!(%room, connection = %from, "no peer to signal");
            return false;
        };
        peer.deliver(RelayEvent::Signal { data })
    }

    /// Remove a connection, telling the remaining member it left
    pub fn leave(&self, room: &RoomId, id: ConnectionId) {
        let mut rooms = self.inner.lock().unwrap();
        let Some(members) = rooms.get_mut(room) else {
            return;
        };
        members.retain(|m| m.id != id);
        info!(%room, connection = %id, "left room");

        if members.is_empty() {
            rooms.remove(room);
            debug!(%room, "room closed");
        } else {
            for member in members.iter() {
                member.deliver(RelayEvent::Left);
            }
        }
    }

    /// Members currently in `room`
    pub fn occupancy(&self, room: &RoomId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(room)
            .map_or(0, |members| members.len())
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}
