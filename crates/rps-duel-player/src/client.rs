//! Player configuration and dispatch of relay events and typed commands.

use crate::console::{status_line, Command, HELP};
use crate::tunnel::decode_signal;
use rps_duel_core::protocol::{InvalidRoomId, RelayEvent, RoomId};
use rps_duel_core::session::{SessionDriver, SessionError, SessionEvent};
use rps_duel_core::transport::Frontend;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_RELAY_URL: &str = "ws://localhost:3000/ws";

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no room given: pass it as the first argument or set ROOM_ID")]
    MissingRoom,

    #[error(transparent)]
    InvalidRoom(#[from] InvalidRoomId),

    #[error("relay error: {0}")]
    Relay(String),

    #[error("relay connection failed: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode relay request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerConfig {
    pub relay_url: String,
    pub room: RoomId,
}

impl PlayerConfig {
    /// Room from `arg` or `ROOM_ID`, relay from `RELAY_URL`
    pub fn from_env(arg: Option<String>) -> Result<Self, PlayerError> {
        Self::from_lookup(arg, |name| std::env::var(name).ok())
    }

    pub fn from_lookup(
        arg: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PlayerError> {
        let room = arg
            .or_else(|| lookup("ROOM_ID"))
            .ok_or(PlayerError::MissingRoom)?
            .parse()?;
        let relay_url = lookup("RELAY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_string());
        Ok(Self { relay_url, room })
    }
}

/// Whether the main loop keeps going
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Feed one relay event into the session
pub fn on_relay_event<F: Frontend>(
    driver: &mut SessionDriver<F>,
    event: RelayEvent,
) -> Result<Flow, PlayerError> {
    match event {
        RelayEvent::Joined { id } => {
            info!(id, "joined room");
            println!("joined as player {}, waiting for an opponent", id);
        }
        RelayEvent::Ready { initiator } => {
            info!(initiator, "room ready");
            println!("opponent connected");
            report(driver.handle(SessionEvent::ChannelOpened));
        }
        RelayEvent::Signal { data } => {
            if let Some(message) = decode_signal(data) {
                report(driver.handle(SessionEvent::Peer(message)));
            }
        }
        RelayEvent::Left => {
            report(driver.handle(SessionEvent::ChannelClosed));
        }
        RelayEvent::Error { message } => return Err(PlayerError::Relay(message)),
    }
    Ok(Flow::Continue)
}

/// Act on one line typed by the player
pub fn on_input<F: Frontend>(driver: &mut SessionDriver<F>, line: &str) -> Flow {
    if line.trim().is_empty() {
        return Flow::Continue;
    }
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            println!("{}", e);
            return Flow::Continue;
        }
    };

    match command {
        Command::Play(mv) => report(driver.handle(SessionEvent::MoveChosen(mv))),
        Command::Rematch => report(driver.handle(SessionEvent::RematchRequested)),
        Command::Status => println!("{}", status_line(&driver.session().view())),
        Command::Help => println!("{}", HELP),
        Command::Quit => return Flow::Exit,
    }
    Flow::Continue
}

/// Session errors are already shown through the rendered view
fn report(result: Result<(), SessionError>) {
    if let Err(e) = result {
        debug!("{}", e);
    }
}
