//! WebSocket upgrade handler and per-connection session loop.
//!
//! The first text frame must be an `authenticate` message; nothing else is
//! routed until it succeeds. After that the loop multiplexes inbound
//! frames, the connection's outbound queue, heartbeat pings, and the
//! connection's cancellation token.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use creatorhub_core::traits::VerifiedIdentity;
use creatorhub_core::{AppError, AppResult, ErrorKind};
use creatorhub_protocol::ServerMessage;
use creatorhub_protocol::builder::{build_auth_error, build_error};
use creatorhub_protocol::serializer::encode_server;
use creatorhub_realtime::ConnectionHandle;
use creatorhub_realtime::connection::heartbeat::{self, HeartbeatConfig, HeartbeatStatus};

use crate::state::AppState;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// GET /ws: WebSocket upgrade
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max_size = state.engine.config().max_message_size;
    ws.max_message_size(max_size)
        .on_upgrade(move |socket| handle_socket(state, socket))
}

/// Handles an established WebSocket connection from handshake to cleanup.
async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();

    let identity = match await_credential(&state, &mut stream).await {
        Ok(identity) => identity,
        Err(e) => {
            debug!(error = %e, "WebSocket handshake rejected");
            let _ = send_message(&mut sink, &build_auth_error(e.message)).await;
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    let connections = state.engine.connections.clone();
    let (handle, outbound) = connections.register(identity).await;

    run_session(&state, &handle, &mut sink, &mut stream, outbound).await;

    connections.unregister(&handle);
    let _ = sink.send(Message::Close(None)).await;

    info!(
        conn_id = %handle.id,
        user_id = %handle.user_id,
        "WebSocket connection closed"
    );
}

/// Waits for the `authenticate` frame, bounded by the auth timeout.
async fn await_credential(state: &AppState, stream: &mut WsStream) -> AppResult<VerifiedIdentity> {
    let timeout = state.engine.config().auth_timeout();

    let frame = match tokio::time::timeout(timeout, first_text_frame(stream)).await {
        Ok(frame) => frame?,
        Err(_) => {
            state.engine.metrics.auth_failed();
            return Err(AppError::authentication("Authentication timed out"));
        }
    };

    state.engine.connections.authenticate(&frame).await
}

async fn first_text_frame(stream: &mut WsStream) -> AppResult<String> {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => return Ok(text.to_string()),
            Ok(Message::Binary(_)) => {
                return Err(AppError::authentication("Expected an authenticate message"));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Transport,
                    "WebSocket error before authentication",
                    e,
                ));
            }
        }
    }
    Err(AppError::transport("Socket closed before authentication"))
}

async fn run_session(
    state: &AppState,
    handle: &Arc<ConnectionHandle>,
    sink: &mut WsSink,
    stream: &mut WsStream,
    mut outbound: mpsc::Receiver<ServerMessage>,
) {
    let connections = &state.engine.connections;
    let heartbeat_config = HeartbeatConfig::from(state.engine.config());
    let mut ping = tokio::time::interval_at(
        Instant::now() + heartbeat_config.ping_interval,
        heartbeat_config.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let cancel = handle.cancel_token().clone();

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                // Flush what was queued before the close (e.g. a CAPACITY error).
                while let Ok(msg) = outbound.try_recv() {
                    if send_message(sink, &msg).await.is_err() {
                        break;
                    }
                }
                break;
            }

            Some(msg) = outbound.recv() => {
                if let Err(e) = send_message(sink, &msg).await {
                    debug!(conn_id = %handle.id, error = %e, "Outbound send failed");
                    break;
                }
            }

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    connections.handle_inbound(handle, text.as_str()).await;
                }
                Some(Ok(Message::Pong(_))) => handle.record_pong(),
                Some(Ok(Message::Binary(_))) => {
                    handle.send(build_error(&AppError::validation(
                        "Binary frames are not supported",
                    )));
                }
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(conn_id = %handle.id, error = %e, "WebSocket error");
                    break;
                }
            },

            _ = ping.tick() => {
                if heartbeat::check(handle, &heartbeat_config) == HeartbeatStatus::TimedOut {
                    warn!(
                        conn_id = %handle.id,
                        user_id = %handle.user_id,
                        "Heartbeat timed out, closing connection"
                    );
                    break;
                }
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_message(sink: &mut WsSink, msg: &ServerMessage) -> AppResult<()> {
    let json = encode_server(msg).inspect_err(|e| {
        error!(event = msg.event_name(), error = %e, "Failed to encode server message");
    })?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Transport, "WebSocket send failed", e))
}
