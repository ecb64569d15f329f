//! Async driver that runs a match session's crypto work off the event loop.

use super::machine::{CryptoTask, MatchSession, SessionError, SessionEvent};
use crate::transport::Frontend;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, warn};

/// Owns a session and its frontend, and runs sealing and opening as
/// blocking tasks whose results are fed back in as events
pub struct SessionDriver<F: Frontend> {
    session: MatchSession,
    frontend: F,
    tasks: JoinSet<SessionEvent>,
}

impl<F: Frontend> SessionDriver<F> {
    pub fn new(frontend: F) -> Self {
        Self {
            session: MatchSession::new(),
            frontend,
            tasks: JoinSet::new(),
        }
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    /// Apply an event and schedule any crypto work it produces
    pub fn handle(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        if let Some(task) = self.session.apply(event, &mut self.frontend)? {
            self.spawn(task);
        }
        Ok(())
    }

    fn spawn(&mut self, task: CryptoTask) {
        self.tasks.spawn_blocking(move || task.run());
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Wait for the next finished crypto task. Pends forever when none are
    /// in flight, so it can sit in a `select!` next to other sources.
    pub async fn next_completion(&mut self) -> SessionEvent {
        loop {
            match self.tasks.join_next().await {
                Some(Ok(event)) => return event,
                Some(Err(e)) => error!("crypto task failed: {}", e),
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Feed events from `inbound` and task completions into the session
    /// until the inbound channel closes
    pub async fn run(mut self, mut inbound: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        loop {
            let event = tokio::select! {
                event = inbound.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                event = self.next_completion() => event,
            };
            if let Err(e) = self.handle(event) {
                warn!("{}", e);
            }
        }

        // let in-flight work land so the final state is observable
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(event) => {
                    if let Err(e) = self.handle(event) {
                        warn!("{}", e);
                    }
                }
                Err(e) => error!("crypto task failed: {}", e),
            }
        }
        self
    }
}
