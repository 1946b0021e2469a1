//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::application::services::{
    EventBus, JwtTokenVerifier, MessageService, Relay, TokenVerifier,
};
use crate::config::Settings;
use crate::domain::{MessageRepository, ParticipantRepository};
use crate::infrastructure::pubsub::{self, RedisEventBus, RelayEnvelope};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{PgMessageRepository, PgParticipantRepository};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::ConnectionRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub relay: Arc<Relay>,
    pub messages: Arc<MessageService>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub settings: Arc<Settings>,
    /// Probed by the readiness check when present
    pub db: Option<PgPool>,
    pub redis: Option<ConnectionManager>,
}

impl AppState {
    /// Wire the relay services. Without a `bus`, events are delivered
    /// straight to this instance's registry.
    pub fn new(
        settings: Settings,
        verifier: Arc<dyn TokenVerifier>,
        message_repo: Arc<dyn MessageRepository>,
        participant_repo: Arc<dyn ParticipantRepository>,
        bus: Option<Arc<dyn EventBus>>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let bus = bus.unwrap_or_else(|| registry.clone() as Arc<dyn EventBus>);
        let relay = Arc::new(Relay::new(bus, participant_repo.clone()));
        let messages = Arc::new(MessageService::new(
            message_repo,
            participant_repo,
            relay.clone(),
        ));

        Self {
            registry,
            relay,
            messages,
            verifier,
            settings: Arc::new(settings),
            db: None,
            redis: None,
        }
    }

    pub fn with_db(mut self, db: PgPool) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_redis(mut self, redis: ConnectionManager) -> Self {
        self.redis = Some(redis);
        self
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    subscriber: Option<JoinHandle<()>>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");
        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        // Redis is optional; without it fan-out stays on this instance
        let redis = match &settings.redis.url {
            Some(url) => Some(pubsub::connect(url).await?),
            None => {
                tracing::info!("Redis not configured, relay is process-local");
                None
            }
        };

        let verifier = Arc::new(JwtTokenVerifier::new(&settings.jwt));
        let message_repo = Arc::new(PgMessageRepository::new(db.clone()));
        let participant_repo = Arc::new(PgParticipantRepository::new(db.clone()));
        let bus = redis
            .as_ref()
            .map(|(_, conn)| Arc::new(RedisEventBus::new(conn.clone())) as Arc<dyn EventBus>);

        let mut state = AppState::new(
            settings.clone(),
            verifier,
            message_repo,
            participant_repo,
            bus,
        )
        .with_db(db);

        let subscriber = match redis {
            Some((client, conn)) => {
                state = state.with_redis(conn);
                let registry = state.registry.clone();
                let deliver = Arc::new(move |envelope: RelayEnvelope| {
                    registry.deliver(envelope.user_id, &envelope.event);
                });
                Some(pubsub::spawn_subscriber(client, deliver))
            }
            None => None,
        };

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let listener = TcpListener::bind(settings.server_addr()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            subscriber,
        })
    }

    /// Run the server until stopped by Ctrl-C
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(subscriber) = self.subscriber {
            subscriber.abort();
        }
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
