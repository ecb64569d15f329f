//! RPS Duel terminal player
//!
//! Joins a relay room and plays a match from stdin, carrying the peer channel
//! inside relay `signal` envelopes.

mod client;
mod console;
mod tunnel;

use client::{on_input, on_relay_event, Flow, PlayerConfig, PlayerError};
use futures_util::{SinkExt, StreamExt};
use rps_duel_core::protocol::{RelayEvent, RelayRequest};
use rps_duel_core::session::SessionDriver;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tunnel::RelayTunnel;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout belongs to the game, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = PlayerConfig::from_env(std::env::args().nth(1))?;
    if let Err(e) = play(config).await {
        error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn play(config: PlayerConfig) -> Result<(), PlayerError> {
    info!(url = %config.relay_url, room = %config.room, "connecting to relay");
    let (socket, _) = connect_async(config.relay_url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();

    let (outbound, mut requests) = mpsc::unbounded_channel::<RelayRequest>();
    let writer = tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let text = request.to_json()?;
            sink.send(Message::Text(text)).await?;
        }
        sink.close().await?;
        Ok::<(), PlayerError>(())
    });

    outbound
        .send(RelayRequest::Join {
            room_id: config.room.clone(),
        })
        .map_err(|_| PlayerError::Relay("connection closed before joining".to_string()))?;
    println!("room {}, type 'help' for commands", config.room);

    let mut driver = SessionDriver::new(RelayTunnel::new(outbound.clone()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let result = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match RelayEvent::from_json(&text) {
                    Ok(event) => match on_relay_event(&mut driver, event) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Exit) => break Ok(()),
                        Err(e) => break Err(e),
                    },
                    Err(e) => warn!("ignoring malformed relay frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    println!("relay closed the connection");
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if on_input(&mut driver, &line) == Flow::Exit {
                        break Ok(());
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e.into()),
            },
            event = driver.next_completion() => {
                if let Err(e) = driver.handle(event) {
                    warn!("{}", e);
                }
            }
        }
    };

    drop(driver);
    drop(outbound);
    match writer.await {
        Ok(Err(e)) => warn!("relay writer stopped: {}", e),
        Err(e) => warn!("relay writer task failed: {}", e),
        Ok(Ok(())) => {}
    }
    result
}
