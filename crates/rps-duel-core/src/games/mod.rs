//! Game rules: moves, judging and scoring.

mod rps;
mod scoring;

pub use rps::{Move, Outcome, UnknownMove};
pub use scoring::{score_round, MatchOutcome, ScoreDelta, Scoreboard, WINNING_SCORE};
