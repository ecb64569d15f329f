//! End-to-end tests against a live relay.
//!
//! Each test serves the router on an ephemeral port and talks to it over
//! real WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use rps_duel_core::{
    games::{Move, Scoreboard},
    protocol::{PeerMessage, RelayEvent, RelayRequest},
    session::{MatchSession, Phase, SessionEvent},
    transport::RecordingFrontend,
};
use rps_duel_relay::{create_router, AppState, RelayConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_relay() -> SocketAddr {
    let config = RelayConfig {
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"),
        ..RelayConfig::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(AppState::new(config)))
            .await
            .unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    socket
}

async fn send(socket: &mut Socket, request: &RelayRequest) {
    socket
        .send(Message::Text(request.to_json().unwrap()))
        .await
        .unwrap();
}

async fn send_raw(socket: &mut Socket, text: &str) {
    socket.send(Message::Text(text.to_string())).await.unwrap();
}

async fn recv(socket: &mut Socket) -> RelayEvent {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for relay")
            .expect("relay closed the socket")
            .unwrap();
        if let Message::Text(text) = frame {
            return RelayEvent::from_json(&text).unwrap();
        }
    }
}

/// Nothing arrives within a short window
async fn assert_quiet(socket: &mut Socket) {
    let next = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    assert!(next.is_err(), "unexpected frame: {:?}", next);
}

async fn join(socket: &mut Socket, room: &str) {
    send(socket, &RelayRequest::Join {
        room_id: room.parse().unwrap(),
    })
    .await;
}

/// Two joined clients, returned as (initiator, responder)
async fn paired(addr: SocketAddr, room: &str) -> (Socket, Socket) {
    let mut a = connect(addr).await;
    join(&mut a, room).await;
    assert_eq!(recv(&mut a).await, RelayEvent::Joined { id: 1 });

    let mut b = connect(addr).await;
    join(&mut b, room).await;
    assert_eq!(recv(&mut b).await, RelayEvent::Joined { id: 2 });

    assert_eq!(recv(&mut a).await, RelayEvent::Ready { initiator: true });
    assert_eq!(recv(&mut b).await, RelayEvent::Ready { initiator: false });
    (a, b)
}

#[tokio::test]
async fn test_pairing_and_signal_forwarding() {
    let addr = spawn_relay().await;
    let (mut a, mut b) = paired(addr, "lobby").await;

    let offer = serde_json::json!({"sdp": "offer", "n": 1});
    send(&mut a, &RelayRequest::Signal { data: offer.clone() }).await;
    assert_eq!(recv(&mut b).await, RelayEvent::Signal { data: offer });

    let answer = serde_json::json!({"sdp": "answer"});
    send(&mut b, &RelayRequest::Signal { data: answer.clone() }).await;
    assert_eq!(recv(&mut a).await, RelayEvent::Signal { data: answer });

    assert_quiet(&mut a).await;
    assert_quiet(&mut b).await;
}

#[tokio::test]
async fn test_third_client_refused() {
    let addr = spawn_relay().await;
    let (_a, _b) = paired(addr, "busy").await;

    let mut c = connect(addr).await;
    join(&mut c, "busy").await;
    assert_eq!(
        recv(&mut c).await,
        RelayEvent::Error {
            message: "Room full".to_string()
        }
    );
}

#[tokio::test]
async fn test_bad_frames_keep_connection() {
    let addr = spawn_relay().await;
    let mut a = connect(addr).await;

    send_raw(&mut a, "{oops").await;
    assert_eq!(
        recv(&mut a).await,
        RelayEvent::Error {
            message: "Invalid message".to_string()
        }
    );

    send_raw(&mut a, r#"{"type":"join","roomId":""}"#).await;
    assert_eq!(
        recv(&mut a).await,
        RelayEvent::Error {
            message: "Invalid room id".to_string()
        }
    );

    join(&mut a, "after-errors").await;
    assert_eq!(recv(&mut a).await, RelayEvent::Joined { id: 1 });
}

#[tokio::test]
async fn test_departure_sends_left() {
    let addr = spawn_relay().await;
    let (mut a, mut b) = paired(addr, "exit").await;

    b.close(None).await.unwrap();
    assert_eq!(recv(&mut a).await, RelayEvent::Left);

    // the slot is free for a newcomer, who becomes the responder
    let mut c = connect(addr).await;
    join(&mut c, "exit").await;
    assert_eq!(recv(&mut c).await, RelayEvent::Joined { id: 2 });
    assert_eq!(recv(&mut c).await, RelayEvent::Ready { initiator: false });
    assert_eq!(recv(&mut a).await, RelayEvent::Ready { initiator: true });
}

#[tokio::test]
async fn test_room_pages_and_health() {
    let addr = spawn_relay().await;

    let page = reqwest::get(format!("http://{}/rock-paper-scissors/room-42", addr))
        .await
        .unwrap();
    assert!(page.status().is_success());
    assert!(page.text().await.unwrap().contains("RPS Duel"));

    let health = reqwest::get(format!("http://{}/api/health", addr))
        .await
        .unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");
}

/// A player whose peer channel is tunneled through relay signals
struct Side {
    socket: Socket,
    session: MatchSession,
    frontend: RecordingFrontend,
}

impl Side {
    fn new(socket: Socket) -> Self {
        let mut side = Side {
            socket,
            session: MatchSession::new(),
            frontend: RecordingFrontend::new(),
        };
        side.apply(SessionEvent::ChannelOpened);
        side
    }

    /// Apply an event, completing crypto work inline
    fn apply(&mut self, event: SessionEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            next = self
                .session
                .apply(event, &mut self.frontend)
                .unwrap()
                .map(|task| task.run());
        }
    }
}

/// Tunnel everything `from` sent to `to` through the relay
async fn flush(from: &mut Side, to: &mut Side) -> usize {
    let messages = from.frontend.drain_sent();
    for message in &messages {
        let data = serde_json::to_value(message).unwrap();
        send(&mut from.socket, &RelayRequest::Signal { data }).await;
    }
    for _ in 0..messages.len() {
        match recv(&mut to.socket).await {
            RelayEvent::Signal { data } => {
                let message: PeerMessage = serde_json::from_value(data).unwrap();
                to.apply(SessionEvent::Peer(message));
            }
            other => panic!("expected a signal, got {:?}", other),
        }
    }
    messages.len()
}

async fn play_round(a: &mut Side, b: &mut Side, a_move: Move, b_move: Move) {
    a.apply(SessionEvent::MoveChosen(a_move));
    b.apply(SessionEvent::MoveChosen(b_move));
    while flush(a, b).await + flush(b, a).await > 0 {}
}

#[tokio::test]
async fn test_full_match_through_relay() {
    let addr = spawn_relay().await;
    let (a, b) = paired(addr, "match").await;
    let mut a = Side::new(a);
    let mut b = Side::new(b);

    play_round(&mut a, &mut b, Move::Rock, Move::Scissors).await;
    assert_eq!(a.session.state().scores, Scoreboard { own: 2, opponent: 0 });

    play_round(&mut a, &mut b, Move::Paper, Move::Paper).await;
    play_round(&mut a, &mut b, Move::Rock, Move::Paper).await;
    play_round(&mut a, &mut b, Move::Scissors, Move::Paper).await;

    assert_eq!(a.session.state().scores, Scoreboard { own: 5, opponent: 3 });
    assert_eq!(b.session.state().scores, Scoreboard { own: 3, opponent: 5 });
    assert_eq!(a.session.phase(), Phase::GameOver);
    assert_eq!(b.session.phase(), Phase::GameOver);

    a.apply(SessionEvent::RematchRequested);
    b.apply(SessionEvent::RematchRequested);
    while flush(&mut a, &mut b).await + flush(&mut b, &mut a).await > 0 {}

    assert_eq!(a.session.phase(), Phase::AwaitingMove);
    assert_eq!(b.session.phase(), Phase::AwaitingMove);
    assert_eq!(a.session.state().scores, Scoreboard::default());
}
