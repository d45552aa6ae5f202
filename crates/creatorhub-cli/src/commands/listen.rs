//! Connect to a relay as a client and print every event as a JSON line.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde_json::json;
use tokio::sync::mpsc;

use creatorhub_client::notifier::LogNotifier;
use creatorhub_client::{ClientEvent, EventKind, RelayClient};
use creatorhub_core::AppError;
use creatorhub_core::config::AppConfig;
use creatorhub_entity::notification::{NotificationType, SubscriptionPreference};
use creatorhub_protocol::{RoomKey, ServerMessage};

use crate::output;

/// Arguments for the listen command
#[derive(Debug, Args)]
pub struct ListenArgs {
    /// Credential to authenticate with
    #[arg(short, long)]
    pub token: String,

    /// Override the client endpoint (e.g. `ws://127.0.0.1:8080/ws`)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Subscribe to these notification types (repeatable); all when omitted
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<NotificationType>,

    /// Rooms to join after authenticating, e.g. `stream:42` (repeatable)
    #[arg(long = "join", value_name = "ROOM")]
    pub rooms: Vec<String>,

    /// Stop after this many seconds
    #[arg(long)]
    pub seconds: Option<u64>,
}

/// Execute the listen command
pub async fn execute(args: &ListenArgs, config: &AppConfig) -> Result<(), AppError> {
    let rooms = args
        .rooms
        .iter()
        .map(|r| RoomKey::parse(r))
        .collect::<Result<Vec<_>, _>>()?;

    let mut client_config = config.client.clone();
    if let Some(endpoint) = &args.endpoint {
        client_config.endpoint = endpoint.clone();
    }

    let client = Arc::new(RelayClient::with_notifier(
        &client_config,
        Arc::new(LogNotifier),
    ));
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
    for kind in EventKind::ALL {
        let tx = tx.clone();
        client.on(kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    drop(tx);

    client.connect(args.token.clone());

    let deadline = async {
        match args.seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            _ = &mut deadline => break Ok(()),
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = rx.recv() => {
                let Some(event) = event else { break Ok(()) };
                print_event(&event);
                match event {
                    ClientEvent::Server(ServerMessage::Authenticated { .. }) => {
                        client.subscribe_notifications(preference(&args.types));
                        for room in &rooms {
                            client.join_room(room);
                        }
                    }
                    ClientEvent::Server(ServerMessage::AuthError { reason }) => {
                        break Err(AppError::authentication(reason));
                    }
                    ClientEvent::MaxReconnectAttemptsReached { attempts } => {
                        break Err(AppError::new(
                            creatorhub_core::ErrorKind::MaxReconnectAttempts,
                            format!("Gave up after {attempts} reconnect attempts"),
                        ));
                    }
                    _ => {}
                }
            }
        }
    };

    client.disconnect().await;
    result
}

fn preference(types: &[NotificationType]) -> SubscriptionPreference {
    if types.is_empty() {
        SubscriptionPreference::default()
    } else {
        SubscriptionPreference::only(types.iter().copied())
    }
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Server(msg) => output::print_line(msg),
        ClientEvent::StateChanged(state) => {
            output::print_line(&json!({ "event": "state", "data": state.to_string() }))
        }
        ClientEvent::Disconnected { reason } => {
            output::print_line(&json!({ "event": "disconnected", "data": { "reason": reason } }))
        }
        ClientEvent::Reconnecting { attempt, delay } => output::print_line(&json!({
            "event": "reconnecting",
            "data": { "attempt": attempt, "delayMs": delay.as_millis() as u64 }
        })),
        ClientEvent::TransportError { message } => {
            output::print_line(&json!({ "event": "transport_error", "data": { "message": message } }))
        }
        ClientEvent::MaxReconnectAttemptsReached { attempts } => output::print_line(&json!({
            "event": "max_reconnect_attempts_reached",
            "data": { "attempts": attempts }
        })),
    }
}
