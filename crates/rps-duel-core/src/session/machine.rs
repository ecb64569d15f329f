//! Round and match state machine.
//!
//! One `MatchSession` owns all per-round and per-match state. Events are
//! applied synchronously; sealing and opening are handed back to the caller
//! as [`CryptoTask`]s whose completions come back in as events.

use super::view::{Phase, SessionView};
use crate::crypto::{CryptoError, MoveKey, SealedMove};
use crate::games::{score_round, Move, ScoreDelta, Scoreboard};
use crate::protocol::{Observation, PeerMessage, PendingReveal, Resolution, Round, RoundError};
use crate::transport::{Frontend, TransportError};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors from applying a session event
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot choose a move while {0}")]
    MoveNotAllowed(Phase),

    #[error(transparent)]
    Round(#[from] RoundError),

    #[error("a rematch can only be requested once the match is over")]
    RematchNotAllowed,

    #[error("round {round} cannot be scored: {source}")]
    Verification { round: u64, source: CryptoError },

    #[error("failed to seal move: {0}")]
    Seal(CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Inputs to the state machine
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// The peer channel is up; a new match begins
    ChannelOpened,
    /// The peer left
    ChannelClosed,
    MoveChosen(Move),
    RematchRequested,
    Peer(PeerMessage),
    /// A [`CryptoTask::Seal`] finished
    Sealed {
        round: u64,
        result: Result<(MoveKey, SealedMove), CryptoError>,
    },
    /// A [`CryptoTask::Open`] finished
    Opened {
        round: u64,
        result: Result<Resolution, CryptoError>,
    },
}

/// Cryptographic work the session asks its driver to run
#[derive(Clone, Debug)]
pub enum CryptoTask {
    Seal { round: u64, mv: Move },
    Open(PendingReveal),
}

impl CryptoTask {
    /// Do the work and wrap the result as the continuation event
    pub fn run(self) -> SessionEvent {
        match self {
            CryptoTask::Seal { round, mv } => SessionEvent::Sealed {
                round,
                result: SealedMove::seal(mv),
            },
            CryptoTask::Open(reveal) => SessionEvent::Opened {
                round: reveal.round(),
                result: reveal.open(),
            },
        }
    }
}

/// State that survives across rounds of one match
#[derive(Clone, Debug, Default)]
pub struct MatchState {
    pub scores: Scoreboard,
    pub last_delta: Option<ScoreDelta>,
    pub last_round: Option<Resolution>,
    pub wants_rematch: bool,
    pub opponent_wants_rematch: bool,
}

/// A match between the local player and one opponent
#[derive(Debug)]
pub struct MatchSession {
    phase: Phase,
    round: Round,
    rounds_started: u64,
    state: MatchState,
    /// Next-round commitments that arrived while this round was mid-reveal
    deferred: VecDeque<SealedMove>,
    /// Inputs of the most recent reveal, to spot late duplicates
    last_reveal: Option<PendingReveal>,
    peer_left: bool,
    last_error: Option<String>,
}

impl Default for MatchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            round: Round::new(0),
            rounds_started: 0,
            state: MatchState::default(),
            deferred: VecDeque::new(),
            last_reveal: None,
            peer_left: false,
            last_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Apply one event, render the result, and return any crypto work to run
    pub fn apply<F: Frontend>(
        &mut self,
        event: SessionEvent,
        frontend: &mut F,
    ) -> Result<Option<CryptoTask>, SessionError> {
        let result = match event {
            SessionEvent::ChannelOpened => {
                self.start_match();
                Ok(None)
            }
            SessionEvent::ChannelClosed => {
                self.on_peer_left();
                Ok(None)
            }
            SessionEvent::MoveChosen(mv) => self.choose(mv),
            SessionEvent::RematchRequested => self.request_rematch(frontend),
            SessionEvent::Peer(message) => self.on_peer_message(message, frontend),
            SessionEvent::Sealed { round, result } => self.on_sealed(round, result, frontend),
            SessionEvent::Opened { round, result } => self.on_opened(round, result, frontend),
        };

        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        frontend.render(&self.view());
        result
    }

    pub fn view(&self) -> SessionView {
        let over = matches!(self.phase, Phase::GameOver | Phase::RematchPending);
        SessionView {
            phase: self.phase,
            round: self.round.number(),
            scores: self.state.scores,
            last_delta: self.state.last_delta,
            last_round: self.state.last_round,
            local_move: self.round.local_move(),
            opponent_committed: self.round.has_remote_commitment(),
            wants_rematch: self.state.wants_rematch,
            opponent_wants_rematch: self.state.opponent_wants_rematch,
            outcome: if over { self.state.scores.outcome() } else { None },
            peer_left: self.peer_left,
            error: self.last_error.clone(),
        }
    }

    fn fresh_round(&mut self) {
        self.rounds_started += 1;
        self.round = Round::new(self.rounds_started);
    }

    fn start_match(&mut self) {
        self.state = MatchState::default();
        self.deferred.clear();
        self.last_reveal = None;
        self.fresh_round();
        self.phase = Phase::AwaitingMove;
        self.peer_left = false;
        self.last_error = None;
        info!(round = self.round.number(), "new match");
    }

    fn on_peer_left(&mut self) {
        info!("peer left");
        self.deferred.clear();
        self.last_reveal = None;
        self.fresh_round();
        self.phase = Phase::Idle;
        self.peer_left = true;
    }

    fn choose(&mut self, mv: Move) -> Result<Option<CryptoTask>, SessionError> {
        if self.phase != Phase::AwaitingMove {
            return Err(SessionError::MoveNotAllowed(self.phase));
        }
        self.round.choose(mv)?;
        self.last_error = None;
        debug!(round = self.round.number(), %mv, "move chosen");

        Ok(Some(CryptoTask::Seal {
            round: self.round.number(),
            mv,
        }))
    }

    fn on_sealed<F: Frontend>(
        &mut self,
        round: u64,
        result: Result<(MoveKey, SealedMove), CryptoError>,
        frontend: &mut F,
    ) -> Result<Option<CryptoTask>, SessionError> {
        if round != self.round.number() {
            debug!(round, "discarding seal for a finished round");
            return Ok(None);
        }
        let (key, sealed) = match result {
            Ok(sealed) => sealed,
            Err(e) => {
                error!(round, "sealing failed: {}", e);
                self.phase = Phase::Faulted;
                return Err(SessionError::Seal(e));
            }
        };

        debug!(
            round,
            commitment = %hex::encode(&sealed.fingerprint()[..8]),
            "sending commitment"
        );
        frontend.send(PeerMessage::Move(sealed))?;
        self.round.commit(key)?;
        self.phase = Phase::MoveCommitted;

        self.advance(frontend)
    }

    /// Disclose our key if both commitments have crossed, then start the
    /// reveal once the opponent's key is in
    fn advance<F: Frontend>(
        &mut self,
        frontend: &mut F,
    ) -> Result<Option<CryptoTask>, SessionError> {
        if let Some(key) = self.round.disclose_key_if_ready() {
            debug!(round = self.round.number(), "disclosing key");
            frontend.send(PeerMessage::Key(key))?;
        }
        match self.round.begin_reveal() {
            Some(reveal) => {
                self.last_reveal = Some(reveal.clone());
                Ok(Some(CryptoTask::Open(reveal)))
            }
            None => Ok(None),
        }
    }

    fn is_replayed(&self, consumed: impl Fn(&PendingReveal) -> bool) -> bool {
        self.last_reveal.as_ref().is_some_and(consumed)
    }

    fn accepts_round_messages(&self) -> bool {
        matches!(self.phase, Phase::AwaitingMove | Phase::MoveCommitted)
    }

    fn on_peer_message<F: Frontend>(
        &mut self,
        message: PeerMessage,
        frontend: &mut F,
    ) -> Result<Option<CryptoTask>, SessionError> {
        match message {
            PeerMessage::Move(sealed) => {
                if !self.accepts_round_messages() {
                    warn!(phase = ?self.phase, "ignoring commitment outside a round");
                    return Ok(None);
                }
                if self.is_replayed(|reveal| reveal.consumed_commitment(&sealed)) {
                    debug!(round = self.round.number(), "ignoring duplicate commitment");
                    return Ok(None);
                }
                match self.round.observe_remote_commitment(sealed.clone()) {
                    Observation::Recorded => {
                        debug!(
                            round = self.round.number(),
                            commitment = %hex::encode(&sealed.fingerprint()[..8]),
                            "opponent committed"
                        );
                        self.advance(frontend)
                    }
                    Observation::Duplicate => {
                        debug!(round = self.round.number(), "ignoring duplicate commitment");
                        Ok(None)
                    }
                    Observation::Conflict if self.round.is_revealing() => {
                        debug!(round = self.round.number(), "deferring next-round commitment");
                        self.deferred.push_back(sealed);
                        Ok(None)
                    }
                    Observation::Conflict => {
                        warn!(round = self.round.number(), "ignoring second commitment");
                        Ok(None)
                    }
                }
            }
            PeerMessage::Key(key) => {
                if !self.accepts_round_messages() {
                    warn!(phase = ?self.phase, "ignoring key outside a round");
                    return Ok(None);
                }
                if self.is_replayed(|reveal| reveal.consumed_key(&key)) {
                    debug!(round = self.round.number(), "ignoring duplicate key");
                    return Ok(None);
                }
                match self.round.observe_remote_key(key) {
                    Observation::Recorded => {
                        debug!(round = self.round.number(), "opponent disclosed key");
                        self.advance(frontend)
                    }
                    Observation::Duplicate => {
                        debug!(round = self.round.number(), "ignoring duplicate key");
                        Ok(None)
                    }
                    Observation::Conflict => {
                        warn!(round = self.round.number(), "ignoring second key");
                        Ok(None)
                    }
                }
            }
            PeerMessage::Rematch => {
                if matches!(self.phase, Phase::Idle | Phase::Faulted) {
                    warn!(phase = ?self.phase, "ignoring rematch request");
                    return Ok(None);
                }
                info!("opponent wants a rematch");
                self.state.opponent_wants_rematch = true;
                if self.phase == Phase::GameOver {
                    self.phase = Phase::RematchPending;
                }
                self.try_rematch();
                Ok(None)
            }
        }
    }

    fn on_opened<F: Frontend>(
        &mut self,
        round: u64,
        result: Result<Resolution, CryptoError>,
        frontend: &mut F,
    ) -> Result<Option<CryptoTask>, SessionError> {
        if round != self.round.number() {
            debug!(round, "discarding reveal for a finished round");
            return Ok(None);
        }
        let resolution = match result {
            Ok(resolution) => resolution,
            Err(source) => {
                error!(round, "opponent commitment failed verification: {}", source);
                self.deferred.clear();
                self.phase = Phase::Faulted;
                return Err(SessionError::Verification { round, source });
            }
        };

        let delta = score_round(resolution.local, resolution.remote);
        self.state.scores.apply(delta);
        self.state.last_delta = Some(delta);
        self.state.last_round = Some(resolution);
        self.phase = Phase::Resolved;
        info!(
            round,
            local = %resolution.local,
            remote = %resolution.remote,
            own = self.state.scores.own,
            opponent = self.state.scores.opponent,
            "round resolved"
        );
        frontend.render(&self.view());

        self.fresh_round();
        if let Some(outcome) = self.state.scores.outcome() {
            info!(?outcome, "match over");
            self.deferred.clear();
            self.phase = if self.state.opponent_wants_rematch {
                Phase::RematchPending
            } else {
                Phase::GameOver
            };
        } else {
            self.phase = Phase::AwaitingMove;
            while let Some(sealed) = self.deferred.pop_front() {
                if self.round.observe_remote_commitment(sealed) != Observation::Recorded {
                    warn!(round = self.round.number(), "dropping extra deferred commitment");
                }
            }
        }
        Ok(None)
    }

    fn request_rematch<F: Frontend>(
        &mut self,
        frontend: &mut F,
    ) -> Result<Option<CryptoTask>, SessionError> {
        if !matches!(self.phase, Phase::GameOver | Phase::RematchPending) {
            return Err(SessionError::RematchNotAllowed);
        }
        if self.state.wants_rematch {
            return Ok(None);
        }
        frontend.send(PeerMessage::Rematch)?;
        self.state.wants_rematch = true;
        self.phase = Phase::RematchPending;
        self.last_error = None;
        info!("rematch requested");
        self.try_rematch();
        Ok(None)
    }

    fn try_rematch(&mut self) {
        let over = matches!(self.phase, Phase::GameOver | Phase::RematchPending);
        if over && self.state.wants_rematch && self.state.opponent_wants_rematch {
            self.start_match();
        }
    }
}
