//! RPS Duel Relay
//!
//! Rendezvous relay that pairs two WebSocket clients per room and forwards
//! opaque `signal` payloads between them, plus static serving of the game
//! page.

pub mod config;
pub mod handlers;
pub mod rooms;
pub mod state;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

pub use config::RelayConfig;
pub use rooms::{RelayError, RoomRegistry};
pub use state::AppState;

/// Build the relay's HTTP surface
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config().static_dir.clone();
    let game_page = ServeFile::new(static_dir.join("game.html"));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Relay socket
        .route("/ws", get(handlers::ws_handler))
        // Room pages, whatever the id
        .route_service("/rock-paper-scissors/:room_id", game_page.clone())
        .route_service("/room/:room_id", game_page)
        // Health
        .route("/api/health", get(handlers::health))
        // Static files
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = RelayConfig {
            static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"),
            ..RelayConfig::default()
        };
        create_router(AppState::new(config))
    }

    async fn get_status(uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(get_status("/api/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_room_pages_served() {
        assert_eq!(get_status("/rock-paper-scissors/abc").await, StatusCode::OK);
        assert_eq!(get_status("/room/xyz-123").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_fallback() {
        assert_eq!(get_status("/").await, StatusCode::OK);
        assert_eq!(get_status("/missing.txt").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        assert_ne!(get_status("/ws").await, StatusCode::OK);
    }
}
