//! Common Test Utilities
//!
//! In-memory repositories, token minting, and a relay server bound to an
//! ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

use wayzer_relay::application::services::{JwtTokenVerifier, ADMIN_ROLE};
use wayzer_relay::config::{
    CorsSettings, DatabaseSettings, JwtSettings, RedisSettings, ServerSettings, Settings,
    WebSocketSettings,
};
use wayzer_relay::domain::{
    ChatMessage, MessageRepository, NewChatMessage, ParticipantRepository, UserId,
};
use wayzer_relay::presentation::http::routes;
use wayzer_relay::shared::error::AppError;
use wayzer_relay::startup::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-32-plus-chars";

/// How long a test waits for a frame or a state change
pub const WAIT: Duration = Duration::from_secs(5);

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://unused".into(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: 1,
        },
        redis: RedisSettings::default(),
        jwt: JwtSettings {
            secret: TEST_JWT_SECRET.into(),
            access_token_expiry_minutes: 15,
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings::default(),
        environment: "test".into(),
    }
}

/// Message store backed by a vector
#[derive(Default)]
pub struct InMemoryMessages {
    next_id: AtomicI64,
    rows: Mutex<Vec<ChatMessage>>,
}

impl InMemoryMessages {
    pub fn all(&self) -> Vec<ChatMessage> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessages {
    async fn create(&self, message: &NewChatMessage) -> Result<ChatMessage, AppError> {
        let row = ChatMessage {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id(),
            trip_id: message.trip_id(),
            text: message.text.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.rows.lock().push(row.clone());
        Ok(row)
    }
}

/// Trip membership; the first member of a trip plays the organizer.
#[derive(Default)]
pub struct InMemoryParticipants {
    trips: Mutex<HashMap<i64, Vec<UserId>>>,
}

impl InMemoryParticipants {
    pub fn add_trip(&self, trip_id: i64, members: &[UserId]) {
        self.trips.lock().insert(trip_id, members.to_vec());
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipants {
    async fn accepted_participants(&self, trip_id: i64) -> Result<Vec<UserId>, AppError> {
        Ok(self.trips.lock().get(&trip_id).cloned().unwrap_or_default())
    }

    async fn is_accepted_participant(
        &self,
        trip_id: i64,
        user_id: UserId,
    ) -> Result<bool, AppError> {
        Ok(self
            .trips
            .lock()
            .get(&trip_id)
            .is_some_and(|members| members.contains(&user_id)))
    }
}

/// Test application wired with in-memory collaborators
pub struct TestApp {
    pub state: AppState,
    pub tokens: Arc<JwtTokenVerifier>,
    pub messages: Arc<InMemoryMessages>,
    pub participants: Arc<InMemoryParticipants>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let tokens = Arc::new(JwtTokenVerifier::new(&settings.jwt));
        let messages = Arc::new(InMemoryMessages::default());
        let participants = Arc::new(InMemoryParticipants::default());
        let state = AppState::new(
            settings,
            tokens.clone(),
            messages.clone(),
            participants.clone(),
            None,
        );

        Self {
            state,
            tokens,
            messages,
            participants,
        }
    }

    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }

    /// In-process HTTP client sharing this app's state
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    pub fn token(&self, user_id: UserId) -> String {
        self.tokens.issue(user_id, None).unwrap()
    }

    pub fn admin_token(&self, user_id: UserId) -> String {
        self.tokens.issue(user_id, Some(ADMIN_ROLE)).unwrap()
    }

    /// Serve the app on an ephemeral port
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }
}

pub fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{}/ws", addr)
}

pub async fn connect(addr: SocketAddr) -> WsStream {
    let (socket, _) = connect_async(ws_url(addr)).await.unwrap();
    socket
}

pub async fn send_auth(socket: &mut WsStream, token: &str) {
    use futures::SinkExt;

    let frame = serde_json::json!({ "type": "auth", "token": token }).to_string();
    socket.send(Message::text(frame)).await.unwrap();
}

/// Connect and complete the handshake; returns the socket after `auth_ok`.
pub async fn authenticated(addr: SocketAddr, token: &str) -> WsStream {
    let mut socket = connect(addr).await;
    send_auth(&mut socket, token).await;
    let ack = next_json(&mut socket).await;
    assert_eq!(ack["type"], "auth_ok");
    socket
}

/// Next JSON text frame, skipping control frames.
pub async fn next_json(socket: &mut WsStream) -> serde_json::Value {
    let read = async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Some(Ok(Message::Close(frame))) => panic!("socket closed: {:?}", frame),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {:?}", other),
            }
        }
    };
    tokio::time::timeout(WAIT, read)
        .await
        .expect("timed out waiting for a frame")
}

/// Read until the server closes; returns the close code.
pub async fn close_code(socket: &mut WsStream) -> Option<u16> {
    let read = async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    };
    tokio::time::timeout(WAIT, read)
        .await
        .expect("timed out waiting for close")
}

/// True if no text frame arrives within `window`.
pub async fn stays_silent(socket: &mut WsStream, window: Duration) -> bool {
    let read = async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(_))) => return false,
                Some(Ok(_)) => continue,
                _ => return true,
            }
        }
    };
    tokio::time::timeout(window, read).await.unwrap_or(true)
}

/// Poll `condition` until it holds or `WAIT` elapses.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Await `future` with the shared test timeout.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out")
}
