//! Frontend trait definition.

use crate::protocol::PeerMessage;
use crate::session::SessionView;
use thiserror::Error;

/// Errors from sending on the peer channel
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("peer channel closed")]
    Closed,

    #[error("failed to encode peer message: {0}")]
    Encode(String),
}

/// Capabilities a match session needs from its surroundings
///
/// The session logic is written once against this trait. Implementations can be:
/// - RecordingFrontend for testing
/// - A relay tunnel for the terminal player
/// - A real peer data channel plus a UI
pub trait Frontend {
    /// Send a message to the opponent over the ordered peer channel
    fn send(&mut self, message: PeerMessage) -> Result<(), TransportError>;

    /// Present the current session state
    fn render(&mut self, view: &SessionView);
}
