//! Protocol types, messages and per-round commit-reveal state.

mod messages;
mod round;
mod types;

pub use messages::{PeerMessage, RelayEvent, RelayRequest};
pub use round::{Observation, PendingReveal, Resolution, Round, RoundError};
pub use types::{InvalidRoomId, RoomId, MAX_ROOM_ID_LEN};
