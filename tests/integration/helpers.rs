//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use creatorhub_api::AppState;
use creatorhub_auth::StaticCredentialVerifier;
use creatorhub_client::{ClientEvent, EventKind, RelayClient};
use creatorhub_core::AppResult;
use creatorhub_core::config::{AppConfig, ClientConfig, ReconnectConfig};
use creatorhub_core::types::id::UserId;
use creatorhub_protocol::ServerMessage;

/// How long a test waits for an expected event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Known test identities: `(token, user)`.
pub struct Users {
    pub alice: UserId,
    pub bob: UserId,
    pub carol: UserId,
}

impl Users {
    pub fn new() -> Self {
        Self {
            alice: UserId::new(),
            bob: UserId::new(),
            carol: UserId::new(),
        }
    }

    fn verifier(&self) -> StaticCredentialVerifier {
        StaticCredentialVerifier::new()
            .with_token("alice-token", self.alice)
            .with_token("bob-token", self.bob)
            .with_token("carol-token", self.carol)
    }
}

/// A relay running on a loopback port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: AppState,
    pub users: Users,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<AppResult<()>>,
}

impl TestRelay {
    /// Start a relay on an ephemeral port.
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap(), Users::new()).await
    }

    /// Start a relay on an ephemeral port with `tweak` applied to its
    /// configuration.
    pub async fn start_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        Self::launch("127.0.0.1:0".parse().unwrap(), Users::new(), tweak).await
    }

    /// Start a relay on `addr` for `users`.
    pub async fn start_on(addr: SocketAddr, users: Users) -> Self {
        Self::launch(addr, users, |_| {}).await
    }

    async fn launch(addr: SocketAddr, users: Users, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let listener = TcpListener::bind(addr).await.expect("bind relay");
        let addr = listener.local_addr().expect("local addr");

        let mut config = AppConfig::default();
        config.realtime.notifications.batch_flush_interval_ms = 50;
        config.realtime.presence.offline_grace_ms = 50;
        tweak(&mut config);

        let state = AppState::new(config, Arc::new(users.verifier()));
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(creatorhub_api::serve(listener, state.clone(), async move {
            let _ = stopped.await;
        }));

        Self {
            addr,
            state,
            users,
            stop: Some(stop),
            task,
        }
    }

    /// Endpoint clients should connect to.
    pub fn endpoint(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Client configuration pointed at this relay with a fast backoff.
    pub fn client_config(&self) -> ClientConfig {
        client_config(self.endpoint(), 5, 50)
    }

    /// A connected client whose inbox has already seen `authenticated`.
    pub async fn connect(&self, token: &str) -> (RelayClient, Inbox) {
        let client = RelayClient::new(&self.client_config());
        let mut inbox = Inbox::attach(&client);
        client.connect(token);
        inbox
            .expect(|m| matches!(m, ServerMessage::Authenticated { .. }))
            .await;
        (client, inbox)
    }

    /// Stop the relay and wait for it to drain. Returns the users so a
    /// replacement relay can accept the same tokens.
    pub async fn stop(mut self) -> Users {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task
            .await
            .expect("relay task")
            .expect("relay shut down cleanly");
        self.users
    }
}

/// Client configuration for `endpoint`.
pub fn client_config(endpoint: String, max_attempts: u32, base_delay_ms: u64) -> ClientConfig {
    ClientConfig {
        endpoint,
        connect_timeout_ms: 2_000,
        reconnect: ReconnectConfig {
            max_attempts,
            base_delay_ms,
        },
    }
}

/// Every event a client emits, in order.
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<ClientEvent>,
}

impl Inbox {
    /// Register a forwarding handler for every event kind.
    pub fn attach(client: &RelayClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for kind in EventKind::ALL {
            let tx = tx.clone();
            client.on(kind, move |event| {
                let _ = tx.send(event.clone());
            });
        }
        Self { rx }
    }

    /// Next event of any kind.
    pub async fn next(&mut self) -> ClientEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for a client event")
            .expect("event channel closed")
    }

    /// Skip events until one matches `pred`.
    pub async fn next_matching(&mut self, pred: impl Fn(&ClientEvent) -> bool) -> ClientEvent {
        loop {
            let event = self.next().await;
            if pred(&event) {
                return event;
            }
        }
    }

    /// Skip events until a server push matches `pred`.
    pub async fn expect(&mut self, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        let event = self
            .next_matching(|e| e.as_server().is_some_and(&pred))
            .await;
        match event {
            ClientEvent::Server(msg) => msg,
            other => panic!("unexpected event {other:?}"),
        }
    }

    /// Assert that no server push matching `pred` arrives within `window`.
    pub async fn assert_none(&mut self, window: Duration, pred: impl Fn(&ServerMessage) -> bool) {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Err(_) | Ok(None) => return,
                Ok(Some(event)) => {
                    if let Some(msg) = event.as_server() {
                        assert!(!pred(msg), "unexpected push {msg:?}");
                    }
                }
            }
        }
    }

    /// Drain whatever is queued right now.
    pub fn drain(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
