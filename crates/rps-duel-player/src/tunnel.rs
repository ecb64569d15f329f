//! Peer channel tunneled through relay `signal` envelopes.

use crate::console::ViewPrinter;
use rps_duel_core::protocol::{PeerMessage, RelayRequest};
use rps_duel_core::session::SessionView;
use rps_duel_core::transport::{Frontend, TransportError};
use tokio::sync::mpsc;
use tracing::warn;

/// Frontend that wraps peer messages for the relay and prints views to stdout
pub struct RelayTunnel {
    outbound: mpsc::UnboundedSender<RelayRequest>,
    printer: ViewPrinter,
}

impl RelayTunnel {
    pub fn new(outbound: mpsc::UnboundedSender<RelayRequest>) -> Self {
        Self {
            outbound,
            printer: ViewPrinter::new(),
        }
    }
}

impl Frontend for RelayTunnel {
    fn send(&mut self, message: PeerMessage) -> Result<(), TransportError> {
        let data =
            serde_json::to_value(&message).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.outbound
            .send(RelayRequest::Signal { data })
            .map_err(|_| TransportError::Closed)
    }

    fn render(&mut self, view: &SessionView) {
        for line in self.printer.update(view) {
            println!("{}", line);
        }
    }
}

/// Unwrap a peer message from a relay signal payload
pub fn decode_signal(data: serde_json::Value) -> Option<PeerMessage> {
    match serde_json::from_value(data) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("ignoring unrecognized signal payload: {}", e);
            None
        }
    }
}
