//! Relay configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Directory holding `game.html` and other static assets
    pub static_dir: PathBuf,
    /// Largest WebSocket message accepted from a client
    pub ws_max_message_bytes: usize,
    /// Events queued per connection before further ones are dropped
    pub ws_outbound_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("static"),
            ws_max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            ws_outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Read `PORT`, `BIND_ADDR`, `STATIC_DIR`, `WS_MAX_MESSAGE_BYTES` and
    /// `WS_OUTBOUND_CAPACITY`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or unparseable values keep
    /// their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr),
            port: parse_or(&lookup, "PORT", defaults.port),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            ws_max_message_bytes: parse_or(
                &lookup,
                "WS_MAX_MESSAGE_BYTES",
                defaults.ws_max_message_bytes,
            ),
            ws_outbound_capacity: parse_or(
                &lookup,
                "WS_OUTBOUND_CAPACITY",
                defaults.ws_outbound_capacity,
            ),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {}={:?}", name, raw);
            default
        }),
        None => default,
    }
}
