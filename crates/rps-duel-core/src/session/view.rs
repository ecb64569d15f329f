//! Presentation snapshot of a match session.

use crate::games::{MatchOutcome, Move, ScoreDelta, Scoreboard};
use crate::protocol::Resolution;
use std::fmt;

/// Where the session stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No peer channel yet, or the peer left
    Idle,
    /// Channel open, round fresh, waiting for the local choice
    AwaitingMove,
    /// Local commitment sent, waiting for the opponent's commitment and key
    MoveCommitted,
    /// Both moves known and scored
    Resolved,
    /// A side reached the winning score with the scores unequal
    GameOver,
    /// At least one side asked for a rematch
    RematchPending,
    /// The opponent's commitment failed verification
    Faulted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "connecting",
            Phase::AwaitingMove => "choose",
            Phase::MoveCommitted => "move submitted",
            Phase::Resolved => "resolved",
            Phase::GameOver => "game over",
            Phase::RematchPending => "rematch requested",
            Phase::Faulted => "faulted",
        };
        f.write_str(label)
    }
}

/// What a frontend needs to draw the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionView {
    pub phase: Phase,
    pub round: u64,
    pub scores: Scoreboard,
    /// Points gained in the most recent round
    pub last_delta: Option<ScoreDelta>,
    /// Both moves of the most recent round
    pub last_round: Option<Resolution>,
    /// Our choice for the current round, if made
    pub local_move: Option<Move>,
    /// The opponent's commitment for the current round has arrived
    pub opponent_committed: bool,
    pub wants_rematch: bool,
    pub opponent_wants_rematch: bool,
    /// Set once the match is over
    pub outcome: Option<MatchOutcome>,
    pub peer_left: bool,
    pub error: Option<String>,
}

impl SessionView {
    /// Move buttons should be enabled
    pub fn can_choose(&self) -> bool {
        self.phase == Phase::AwaitingMove && self.local_move.is_none()
    }

    /// Rematch button should be enabled
    pub fn can_request_rematch(&self) -> bool {
        matches!(self.phase, Phase::GameOver | Phase::RematchPending) && !self.wants_rematch
    }
}
