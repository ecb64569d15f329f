//! Recording frontend for testing.

use super::traits::{Frontend, TransportError};
use crate::protocol::PeerMessage;
use crate::session::SessionView;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorded {
    sent: Vec<PeerMessage>,
    views: Vec<SessionView>,
    closed: bool,
}

/// In-memory frontend that records sent messages and rendered views
///
/// Clones share the same record, so a test can keep a handle while the
/// session or driver owns another.
#[derive(Clone, Default)]
pub struct RecordingFrontend {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later send fail with [`TransportError::Closed`]
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
    }

    /// All messages sent so far
    pub fn sent(&self) -> Vec<PeerMessage> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Remove and return the messages sent since the last drain
    pub fn drain_sent(&self) -> Vec<PeerMessage> {
        std::mem::take(&mut self.inner.lock().unwrap().sent)
    }

    /// All views rendered so far
    pub fn views(&self) -> Vec<SessionView> {
        self.inner.lock().unwrap().views.clone()
    }

    /// Most recent view
    pub fn last_view(&self) -> Option<SessionView> {
        self.inner.lock().unwrap().views.last().cloned()
    }
}

impl Frontend for RecordingFrontend {
    fn send(&mut self, message: PeerMessage) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.sent.push(message);
        Ok(())
    }

    fn render(&mut self, view: &SessionView) {
        self.inner.lock().unwrap().views.push(view.clone());
    }
}
