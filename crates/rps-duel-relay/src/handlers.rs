//! HTTP and WebSocket handlers.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use rps_duel_core::protocol::{RelayEvent, RelayRequest, RoomId};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::rooms::{self, ConnectionId, Outbox, RelayError};
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

/// `GET /ws`: upgrade to a relay connection
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(state.config().ws_max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut events) = rooms::outbox(state.config().ws_outbound_capacity);
    debug!(connection = %id, "connection opened");

    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode relay event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut joined: Option<RoomId> = None;
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_request(&state, id, &outbox, &mut joined, &text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(connection = %id, "socket error: {}", e);
                break;
            }
        }
    }

    if let Some(room) = joined {
        state.rooms().leave(&room, id);
    }
    drop(outbox);
    let _ = writer.await;
    debug!(connection = %id, "connection closed");
}

/// Apply one client frame. Replies, including errors, go through `outbox`.
pub fn handle_request(
    state: &AppState,
    id: ConnectionId,
    outbox: &Outbox,
    joined: &mut Option<RoomId>,
    text: &str,
) {
    let request = match RelayRequest::from_json(text) {
        Ok(request) => request,
        Err(e) => {
            warn!(connection = %id, "unparseable frame: {}", e);
            reply_error(outbox, RelayError::InvalidMessage);
            return;
        }
    };

    match request {
        RelayRequest::Join { room_id } => {
            if joined.is_some() {
                reply_error(outbox, RelayError::AlreadyJoined);
                return;
            }
            match state.rooms().join(room_id.clone(), id, outbox.clone()) {
                Ok(_) => *joined = Some(room_id),
                Err(e) => {
                    info!(connection = %id, room = %room_id, "join refused: {}", e);
                    reply_error(outbox, e);
                }
            }
        }
        RelayRequest::Signal { data } => match joined {
            Some(room) => {
                state.rooms().forward_signal(room, id, data);
            }
            None => debug!(connection = %id, "dropping signal from connection outside a room"),
        },
    }
}

fn reply_error(outbox: &Outbox, error: RelayError) {
    if outbox.try_send(error.to_event()).is_err() {
        debug!("error reply dropped: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct Client {
        id: ConnectionId,
        outbox: Outbox,
        events: mpsc::Receiver<RelayEvent>,
        joined: Option<RoomId>,
    }

    impl Client {
        fn new() -> Self {
            let (outbox, events) = rooms::outbox(16);
            Self {
                id: Uuid::new_v4(),
                outbox,
                events,
                joined: None,
            }
        }

        fn send(&mut self, state: &AppState, text: &str) {
            handle_request(state, self.id, &self.outbox, &mut self.joined, text);
        }

        fn next(&mut self) -> Option<RelayEvent> {
            self.events.try_recv().ok()
        }
    }

    fn error(message: &str) -> Option<RelayEvent> {
        Some(RelayEvent::Error {
            message: message.to_string(),
        })
    }

    #[test]
    fn test_join_then_signal() {
        let state = AppState::new(RelayConfig::default());
        let mut a = Client::new();
        let mut b = Client::new();

        a.send(&state, r#"{"type":"join","roomId":"abc"}"#);
        b.send(&state, r#"{"type":"join","roomId":"abc"}"#);
        assert_eq!(a.next(), Some(RelayEvent::Joined { id: 1 }));
        assert_eq!(a.next(), Some(RelayEvent::Ready { initiator: true }));
        assert_eq!(b.next(), Some(RelayEvent::Joined { id: 2 }));
        assert_eq!(b.next(), Some(RelayEvent::Ready { initiator: false }));

        b.send(&state, r#"{"type":"signal","roomId":"abc","data":{"candidate":"c1"}}"#);
        assert_eq!(
            a.next(),
            Some(RelayEvent::Signal {
                data: json!({"candidate": "c1"})
            })
        );
        assert_eq!(b.next(), None);
    }

    #[test]
    fn test_garbage_frame() {
        let state = AppState::new(RelayConfig::default());
        let mut a = Client::new();

        a.send(&state, "not json");
        assert_eq!(a.next(), error("Invalid message"));

        a.send(&state, r#"{"type":"teleport"}"#);
        assert_eq!(a.next(), error("Invalid message"));
    }

    #[test]
    fn test_second_join_refused() {
        let state = AppState::new(RelayConfig::default());
        let mut a = Client::new();

        a.send(&state, r#"{"type":"join","roomId":"abc"}"#);
        a.next();
        a.send(&state, r#"{"type":"join","roomId":"other"}"#);
        assert_eq!(a.next(), error("Already joined"));
        assert_eq!(state.rooms().room_count(), 1);
    }

    #[test]
    fn test_empty_room_id() {
        let state = AppState::new(RelayConfig::default());
        let mut a = Client::new();

        a.send(&state, r#"{"type":"join","roomId":""}"#);
        assert_eq!(a.next(), error("Invalid room id"));
        assert!(a.joined.is_none());
    }

    #[test]
    fn test_flood_bounded_by_outbox() {
        let state = AppState::new(RelayConfig::default());
        let mut a = Client::new();
        let mut b = Client::new();
        a.send(&state, r#"{"type":"join","roomId":"abc"}"#);
        b.send(&state, r#"{"type":"join","roomId":"abc"}"#);

        // b never reads; its outbox already holds joined + ready
        for _ in 0..200 {
            a.send(&state, r#"{"type":"signal","data":"spam"}"#);
        }

        let mut queued = 0;
        while b.next().is_some() {
            queued += 1;
        }
        assert_eq!(queued, 16);
    }

    #[test]
    fn test_signal_before_join_dropped() {
        let state = AppState::new(RelayConfig::default());
        let mut a = Client::new();

        a.send(&state, r#"{"type":"signal","data":"hello"}"#);
        assert_eq!(a.next(), None);
    }
}
