//! API Server - HTTP and realtime WebSocket surface
//!
//! Exposes the service boundary over two transports:
//! - HTTP: confirm-mint, stream listing, note and echo lookups, fees
//! - WebSocket: realtime fanout of confirmed notes, tips and echoes to
//!   all connected listeners

pub mod events;
pub mod fanout;
pub mod handlers;
pub mod http_server;
pub mod ws_server;

pub use events::{spawn_event_drain, StreamEvent};
pub use fanout::{RealtimeFanout, ServerMessage};
pub use handlers::ApiContext;
pub use http_server::HttpApiServer;
pub use ws_server::WebSocketServer;

/// API server configuration
#[derive(Clone, Debug)]
pub struct ApiServerConfig {
    /// HTTP bind address
    pub http_addr: String,
    /// WebSocket bind address
    pub ws_addr: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            ws_addr: "127.0.0.1:8081".to_string(),
        }
    }
}
