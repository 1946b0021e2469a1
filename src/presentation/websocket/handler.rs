//! WebSocket Connection Handler
//!
//! Drives one socket through the auth handshake, registers it, and pumps
//! frames until either side goes away.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use super::handshake::{Handshake, HandshakeStep};
use super::messages::CloseReason;
use super::registry::{ConnectionSender, Outbound};
use super::session::ConnectionState;
use crate::domain::RelayEvent;
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// How long a rejected connection gets to flush its close frame
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

const STATE_AWAITING_AUTH: &str = "awaiting_auth";
const STATE_AUTHENTICATED: &str = "authenticated";

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let limits = &state.settings.websocket;
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// First frame seen while awaiting auth
enum FirstFrame {
    Text(Utf8Bytes),
    Binary,
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut connection = ConnectionState::new();
    let connection_id = connection.id;
    tracing::debug!(connection_id = %connection_id, "New WebSocket connection");

    let (sink, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
    let mut writer = tokio::spawn(write_loop(sink, rx));

    metrics::connection_opened(STATE_AWAITING_AUTH);
    let mut handshake = Handshake::new();
    handshake.open();

    let auth_timeout = state.settings.websocket.auth_timeout();
    let step = match timeout(auth_timeout, read_first_frame(&mut receiver)).await {
        Err(_) => handshake.on_timeout(),
        Ok(None) => {
            tracing::debug!(connection_id = %connection_id, "Connection closed before auth");
            metrics::connection_closed(STATE_AWAITING_AUTH);
            drop(tx);
            let _ = timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await;
            return;
        }
        Ok(Some(FirstFrame::Text(text))) => handshake.on_text(text.as_str(), state.verifier.as_ref()),
        Ok(Some(FirstFrame::Binary)) => handshake.on_binary(),
    };
    metrics::connection_closed(STATE_AWAITING_AUTH);

    let user = match step {
        HandshakeStep::Accepted(user) => user,
        HandshakeStep::Rejected(reason) => {
            reject(connection, tx, writer, reason).await;
            return;
        }
        HandshakeStep::Ignored => {
            reject(connection, tx, writer, CloseReason::MalformedAuth).await;
            return;
        }
    };

    metrics::record_handshake("accepted");
    connection.authenticate(user.user_id);
    connection.touch();
    let user_id = user.user_id;

    state.registry.register(user_id, connection_id, tx.clone());
    metrics::connection_opened(STATE_AUTHENTICATED);
    send_event(&tx, &RelayEvent::AuthOk { user_id });

    tracing::info!(user_id = user_id, connection_id = %connection_id, "User connected");

    let idle_timeout = state.settings.websocket.idle_timeout();
    let mut keepalive = interval(state.settings.websocket.ping_interval());
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    keepalive.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        connection.touch();
                        handle_message(text.as_str(), &connection);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Connection closed by client");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping, pong and binary frames only count as activity
                        connection.touch();
                    }
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            // The writer stops after a close instruction or a failed write
            _ = &mut writer => {
                tracing::debug!(connection_id = %connection_id, "Writer finished");
                break;
            }

            _ = keepalive.tick() => {
                if connection.is_idle(idle_timeout) {
                    tracing::info!(connection_id = %connection_id, "Idle timeout, closing connection");
                    let _ = tx.send(Outbound::Close(CloseReason::IdleTimeout));
                } else {
                    let _ = tx.send(Outbound::Ping);
                }
            }
        }
    }

    // Cleanup
    state.registry.unregister(connection_id);
    metrics::connection_closed(STATE_AUTHENTICATED);
    drop(tx);
    if !writer.is_finished() && timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    tracing::info!(user_id = user_id, connection_id = %connection_id, "User disconnected");
}

/// Close a connection that failed the handshake. It was never registered.
async fn reject(
    connection: ConnectionState,
    tx: ConnectionSender,
    mut writer: JoinHandle<()>,
    reason: CloseReason,
) {
    metrics::record_handshake(reason.as_str());
    tracing::info!(connection_id = %connection.id, reason = %reason, "Handshake rejected");
    let _ = tx.send(Outbound::Close(reason));
    drop(tx);
    if timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
}

/// Read until the first data frame. Returns `None` if the socket closes or
/// errors first.
async fn read_first_frame(receiver: &mut SplitStream<WebSocket>) -> Option<FirstFrame> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(FirstFrame::Text(text)),
            Ok(Message::Binary(_)) => return Some(FirstFrame::Binary),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

/// Forward queued frames to the socket until told to close, the queue is
/// dropped, or a write fails.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(outbound) = rx.recv().await {
        let (message, last) = match outbound {
            Outbound::Text(text) => (Message::Text(text), false),
            Outbound::Ping => (Message::Ping(Bytes::new()), false),
            Outbound::Close(reason) => (
                Message::Close(Some(CloseFrame {
                    code: reason.code(),
                    reason: Utf8Bytes::from_static(reason.as_str()),
                })),
                true,
            ),
        };
        if sink.send(message).await.is_err() || last {
            break;
        }
    }
}

fn send_event(tx: &ConnectionSender, event: &RelayEvent) {
    match serde_json::to_string(event) {
        Ok(text) => {
            let _ = tx.send(Outbound::Text(Utf8Bytes::from(text)));
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize event"),
    }
}

/// Frames after the handshake carry no commands; they are logged and
/// dropped.
fn handle_message(text: &str, connection: &ConnectionState) {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(payload) => tracing::debug!(
            connection_id = %connection.id,
            user_id = ?connection.user_id(),
            frame_type = ?payload.get("type").and_then(|t| t.as_str()),
            "Ignoring client frame after auth"
        ),
        Err(e) => tracing::debug!(
            connection_id = %connection.id,
            error = %e,
            "Ignoring malformed client frame"
        ),
    }
}
