//! RPS Duel Core Library
//!
//! This crate provides the commit-reveal primitives, scoring rules, wire
//! messages and match state machine for a two-player Rock-Paper-Scissors
//! game played over an ordered peer channel.

pub mod crypto;
pub mod games;
pub mod protocol;
pub mod session;
pub mod transport;

pub use crypto::{CryptoError, MoveKey, SealedMove};
pub use games::{score_round, MatchOutcome, Move, Outcome, ScoreDelta, Scoreboard, WINNING_SCORE};
pub use protocol::{PeerMessage, RelayEvent, RelayRequest, Resolution, RoomId};
pub use session::{MatchSession, Phase, SessionDriver, SessionError, SessionEvent, SessionView};
pub use transport::{Frontend, RecordingFrontend, TransportError};
