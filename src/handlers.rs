//! HTTP and WebSocket handlers.
//!
//! The WebSocket endpoint is the whole client surface: every command in
//! [`ClientCommand`] arrives as one JSON text frame, and session
//! broadcasts are pushed back as JSON text frames. One socket may drive
//! several sessions; each create/join adds a forwarder for that
//! session's broadcast stream.

use axum::Json;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ClientCommand, SessionBroadcast};
use crate::build_info::BuildInfo;
use crate::router::CommandRouter;
use crate::server::AppState;

/// Outbound frames queued per connection. A client that stops reading
/// for this many frames gets disconnected instead of blocking actors.
const OUTBOUND_CAPACITY: usize = 64;

// ============================================================================
// Health & Version
// ============================================================================

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

#[derive(Serialize)]
pub struct ReadyzResponse {
    pub status: String,
    pub live_sessions: usize,
}

pub async fn readyz(State(state): State<AppState>) -> Json<ReadyzResponse> {
    Json(ReadyzResponse {
        status: "ok".to_string(),
        live_sessions: state.router.registry().len(),
    })
}

pub async fn version() -> Json<BuildInfo> {
    Json(BuildInfo::new())
}

// ============================================================================
// WebSocket
// ============================================================================

/// Error frame sent directly to the offending client. Everything else
/// a client sees is a [`SessionBroadcast`].
#[derive(Serialize)]
struct ErrorFrame {
    message: String,
}

impl ErrorFrame {
    fn json(detail: impl std::fmt::Display) -> String {
        let frame = ErrorFrame {
            message: format!("error: {detail}"),
        };
        // Serializing two strings cannot fail.
        serde_json::to_string(&frame).unwrap_or_default()
    }
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.router))
}

async fn handle_socket(socket: WebSocket, router: CommandRouter) {
    let (mut sink, mut stream) = socket.split();

    // All outbound traffic (direct replies, errors and forwarded
    // broadcasts) funnels through one queue so only this task writes to
    // the sink.
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            Some(frame) = out_rx.recv() => {
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(forwarder) =
                            handle_frame(&router, &text, &out_tx).await
                        {
                            forwarders.push(forwarder);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Binary, ping and pong are ignored.
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    for forwarder in forwarders {
        forwarder.abort();
    }
}

/// Parse and dispatch one inbound frame.
///
/// A malformed frame or rejected command fails only itself: the error
/// goes back to this client and the connection stays up. Returns the
/// forwarder task when the command subscribed this socket to a session.
async fn handle_frame(
    router: &CommandRouter,
    text: &str,
    out_tx: &mpsc::Sender<String>,
) -> Option<JoinHandle<()>> {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "Malformed client command");
            let _ = out_tx.send(ErrorFrame::json(format!("malformed command: {e}"))).await;
            return None;
        }
    };

    match router.dispatch(command).await {
        Ok(dispatch) => {
            let handle = dispatch.subscribe?;
            let receiver = match handle.subscribe().await {
                Ok(receiver) => receiver,
                Err(e) => {
                    let _ = out_tx.send(ErrorFrame::json(e)).await;
                    return None;
                }
            };
            let forwarder = spawn_forwarder(receiver, out_tx.clone());

            // The subscription starts after this command's broadcast,
            // so the issuer gets its snapshot directly. Clients already
            // subscribed see every later mutation through the stream.
            if let Some(reply) = dispatch.reply {
                if let Ok(json) = serde_json::to_string(&reply) {
                    let _ = out_tx.send(json).await;
                }
            }
            Some(forwarder)
        }
        Err(e) => {
            let _ = out_tx.send(ErrorFrame::json(e)).await;
            None
        }
    }
}

/// Forward one session's broadcasts into the connection's outbound
/// queue. Ends when the session actor stops or the connection closes.
fn spawn_forwarder(
    mut receiver: broadcast::Receiver<SessionBroadcast>,
    out_tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(snapshot) => {
                    let Ok(json) = serde_json::to_string(&snapshot) else {
                        continue;
                    };
                    if out_tx.send(json).await.is_err() {
                        break;
                    }
                }
                // A lagging client misses intermediate snapshots but
                // keeps the stream; the next snapshot is complete anyway.
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "Broadcast subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn livez_is_ok() {
        let (status, body) = livez().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[test]
    fn error_frames_carry_the_error_prefix() {
        let json = ErrorFrame::json("Not enough players to start the game");
        assert_eq!(
            json,
            r#"{"message":"error: Not enough players to start the game"}"#
        );
    }
}
