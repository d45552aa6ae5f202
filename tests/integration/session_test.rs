//! Session lifecycle on a raw WebSocket: the auth deadline and the
//! heartbeat close.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use creatorhub_protocol::serializer::{decode_server, encode_client};
use creatorhub_protocol::{ClientMessage, ServerMessage};

use crate::helpers::{EVENT_TIMEOUT, TestRelay};

type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn raw_connect(relay: &TestRelay) -> RawSocket {
    let (socket, _) = connect_async(relay.endpoint()).await.expect("ws handshake");
    socket
}

/// Next text frame as a server message, skipping control frames.
async fn next_message(socket: &mut RawSocket) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(EVENT_TIMEOUT, socket.next())
            .await
            .expect("frame before timeout")
            .expect("socket still open")
            .expect("frame");
        match frame {
            Message::Text(text) => return decode_server(text.as_str()).expect("decode"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Read until the server closes the socket.
async fn expect_closed(socket: &mut RawSocket) {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await
    .expect("server closed the socket");
}

#[tokio::test]
async fn test_silent_socket_gets_auth_error_then_close() {
    let relay = TestRelay::start_with(|config| config.realtime.auth_timeout_seconds = 1).await;
    let mut socket = raw_connect(&relay).await;

    // Send nothing and wait out the deadline.
    match next_message(&mut socket).await {
        ServerMessage::AuthError { reason } => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected auth_error, got {other:?}"),
    }
    expect_closed(&mut socket).await;

    assert_eq!(relay.state.engine.connections.connection_count(), 0);
    relay.stop().await;
}

#[tokio::test]
async fn test_unanswered_pings_close_the_session() {
    let relay = TestRelay::start_with(|config| {
        config.realtime.ping_interval_seconds = 1;
        config.realtime.ping_timeout_seconds = 1;
    })
    .await;
    let mut socket = raw_connect(&relay).await;

    let authenticate = ClientMessage::Authenticate {
        token: "alice-token".to_string(),
    };
    socket
        .send(Message::Text(encode_client(&authenticate).unwrap().into()))
        .await
        .unwrap();
    assert!(matches!(
        next_message(&mut socket).await,
        ServerMessage::Authenticated { .. }
    ));
    assert_eq!(relay.state.engine.connections.connection_count(), 1);

    // Pongs are only written while the socket is polled, so stay idle
    // past the interval plus timeout.
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    expect_closed(&mut socket).await;

    tokio::time::timeout(EVENT_TIMEOUT, async {
        while relay.state.engine.connections.connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("connection unregistered");
    relay.stop().await;
}
