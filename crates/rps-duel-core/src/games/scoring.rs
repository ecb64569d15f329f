//! Per-round scoring and the match-ending rule.

use super::{Move, Outcome};
use serde::{Deserialize, Serialize};

/// Score a player must reach for the match to end
pub const WINNING_SCORE: u32 = 5;

/// Points awarded to each side for one round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub own: u32,
    pub opponent: u32,
}

/// Score one round: a tie gives both sides 1, a win gives the winner 2
pub fn score_round(own: Move, opponent: Move) -> ScoreDelta {
    match own.versus(&opponent) {
        Outcome::Tie => ScoreDelta { own: 1, opponent: 1 },
        Outcome::Win => ScoreDelta { own: 2, opponent: 0 },
        Outcome::Loss => ScoreDelta { own: 0, opponent: 2 },
    }
}

/// How a finished match ended for the local player
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Won,
    Lost,
}

/// Cumulative scores for one match
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub own: u32,
    pub opponent: u32,
}

impl Scoreboard {
    pub fn apply(&mut self, delta: ScoreDelta) {
        self.own += delta.own;
        self.opponent += delta.opponent;
    }

    /// The match is decided once either side reaches the threshold and the
    /// scores differ. An equal score at or above the threshold keeps playing.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        let reached = self.own >= WINNING_SCORE || self.opponent >= WINNING_SCORE;
        if !reached || self.own == self.opponent {
            return None;
        }
        if self.own > self.opponent {
            Some(MatchOutcome::Won)
        } else {
            Some(MatchOutcome::Lost)
        }
    }
}
