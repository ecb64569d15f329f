//! Peer channel and presentation abstraction.

mod mock;
mod traits;

pub use mock::RecordingFrontend;
pub use traits::{Frontend, TransportError};
