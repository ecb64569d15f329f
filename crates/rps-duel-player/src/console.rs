//! Terminal commands and session rendering.

use rps_duel_core::games::{MatchOutcome, Move, Outcome};
use rps_duel_core::session::{Phase, SessionView};
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  rock | paper | scissors   (or r / p / s) choose this round's move
  rematch                   ask for a new match once this one is over
  status                    show the score
  help                      show this text
  quit                      leave the room";

/// A line typed by the player
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Play(Move),
    Rematch,
    Status,
    Help,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown command '{0}', type 'help' for a list")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_lowercase();
        match word.as_str() {
            "r" => Ok(Command::Play(Move::Rock)),
            "p" => Ok(Command::Play(Move::Paper)),
            "s" => Ok(Command::Play(Move::Scissors)),
            "rematch" | "again" => Ok(Command::Rematch),
            "status" | "score" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => other
                .parse::<Move>()
                .map(Command::Play)
                .map_err(|_| UnknownCommand(s.trim().to_string())),
        }
    }
}

/// One-line score summary
pub fn status_line(view: &SessionView) -> String {
    format!(
        "round {} | you {} - {} opponent | {}",
        view.round, view.scores.own, view.scores.opponent, view.phase
    )
}

fn round_result(view: &SessionView) -> Option<String> {
    let (round, delta) = (view.last_round?, view.last_delta?);
    let verdict = match round.local.versus(&round.remote) {
        Outcome::Win => "you win the round",
        Outcome::Loss => "you lose the round",
        Outcome::Tie => "tie",
    };
    Some(format!(
        "you played {}, opponent played {}: {} (+{} / +{}), score {} - {}",
        round.local,
        round.remote,
        verdict,
        delta.own,
        delta.opponent,
        view.scores.own,
        view.scores.opponent
    ))
}

/// Lines worth telling the player when the view moves from `prev` to `view`
pub fn notices(prev: Option<&SessionView>, view: &SessionView) -> Vec<String> {
    let mut lines = Vec::new();
    let changed = |f: fn(&SessionView) -> bool| prev.map_or(true, |p| f(p) != f(view));

    if let Some(error) = &view.error {
        if prev.map_or(true, |p| p.error.as_ref() != Some(error)) {
            lines.push(format!("! {}", error));
        }
    }

    let phase_changed = prev.map_or(true, |p| p.phase != view.phase || p.round != view.round);
    if phase_changed {
        match view.phase {
            Phase::Idle if view.peer_left => {
                lines.push("opponent left, waiting for a new one".to_string())
            }
            Phase::Idle => lines.push("waiting for an opponent".to_string()),
            Phase::Resolved => lines.extend(round_result(view)),
            Phase::AwaitingMove => {
                lines.push(format!("round {}: choose rock, paper or scissors", view.round))
            }
            Phase::MoveCommitted => {}
            Phase::GameOver => {
                let headline = match view.outcome {
                    Some(MatchOutcome::Won) => format!(
                        "you won the match {} - {}!",
                        view.scores.own, view.scores.opponent
                    ),
                    _ => format!(
                        "you lost the match {} - {}.",
                        view.scores.own, view.scores.opponent
                    ),
                };
                if view.can_request_rematch() {
                    lines.push(format!("{} type 'rematch' to play again", headline));
                } else {
                    lines.push(headline);
                }
            }
            Phase::RematchPending => {}
            Phase::Faulted => lines.push(
                "the opponent's move failed verification, this match is void".to_string(),
            ),
        }
    }

    if view.phase == Phase::MoveCommitted
        && (phase_changed || changed(|v| v.opponent_committed))
    {
        if view.opponent_committed {
            lines.push("both moves are in, revealing...".to_string());
        } else if let Some(mv) = view.local_move {
            lines.push(format!("you chose {}, waiting for the opponent", mv));
        }
    } else if view.phase == Phase::AwaitingMove
        && view.opponent_committed
        && !phase_changed
        && changed(|v| v.opponent_committed)
    {
        lines.push("the opponent has chosen".to_string());
    }

    if view.phase == Phase::RematchPending
        && (phase_changed || changed(|v| v.wants_rematch) || changed(|v| v.opponent_wants_rematch))
    {
        if view.can_request_rematch() {
            lines.push("the opponent wants a rematch, type 'rematch' to accept".to_string());
        } else {
            lines.push("rematch requested, waiting for the opponent".to_string());
        }
    }

    lines
}

/// Prints notices for each rendered view
#[derive(Default)]
pub struct ViewPrinter {
    last: Option<SessionView>,
}

impl ViewPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `view` and return what changed since the previous one
    pub fn update(&mut self, view: &SessionView) -> Vec<String> {
        let lines = notices(self.last.as_ref(), view);
        self.last = Some(view.clone());
        lines
    }
}
