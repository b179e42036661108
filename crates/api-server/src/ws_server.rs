//! WebSocket Server
//!
//! Accepts listener connections and wires each into the fanout: a
//! writer task drains that connection's outbound channel, the read loop
//! answers pings and tolerates anything it does not recognize.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::fanout::{ClientMessage, ServerMessage};
use crate::handlers::ApiContext;

/// WebSocket listener endpoint
pub struct WebSocketServer {
    context: Arc<ApiContext>,
}

impl WebSocketServer {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    /// Run the WebSocket server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("WebSocket server listening on {}", addr);

        while let Ok((stream, peer_addr)) = listener.accept().await {
            let context = self.context.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, context).await {
                    tracing::warn!("WebSocket connection error from {}: {}", peer_addr, e);
                }
            });
        }

        Ok(())
    }
}

/// Handle a single listener connection
async fn handle_connection(stream: TcpStream, context: Arc<ApiContext>) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (client_id, mut outbound) = context.fanout.on_connect();

    // Writer task: drains this connection's fanout channel. If the peer
    // stops accepting writes the task ends and the fanout will drop the
    // connection on its next send.
    let send_task = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if ws_sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => {
                    context.fanout.unicast(client_id, &ServerMessage::Pong);
                }
                Ok(ClientMessage::Unknown) => {
                    tracing::debug!(client_id, "ignoring unrecognized message type");
                }
                Err(e) => {
                    tracing::debug!(client_id, "ignoring unparseable message: {}", e);
                }
            },
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!(client_id, "WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    context.fanout.on_disconnect(client_id);

    Ok(())
}
