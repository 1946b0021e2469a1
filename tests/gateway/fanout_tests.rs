//! Redis fan-out round trip
//!
//! These tests require a running Redis instance.
//! Run with: REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use wayzer_relay::application::services::EventBus;
use wayzer_relay::domain::RelayEvent;
use wayzer_relay::infrastructure::pubsub::{self, RedisEventBus, RelayEnvelope};
use wayzer_relay::presentation::websocket::{CloseReason, ConnectionId, ConnectionRegistry, Outbound};

use crate::common::within;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into())
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_forced_logout_round_trips_through_redis() {
    let (client, manager) = pubsub::connect(&redis_url())
        .await
        .expect("Failed to connect to Redis");

    let registry = Arc::new(ConnectionRegistry::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.register(42, ConnectionId::new(), tx);

    let subscriber = pubsub::spawn_subscriber(client, {
        let registry = registry.clone();
        Arc::new(move |envelope: RelayEnvelope| {
            registry.deliver(envelope.user_id, &envelope.event);
        })
    });

    // Give subscriber time to connect
    tokio::time::sleep(Duration::from_millis(200)).await;

    let bus = RedisEventBus::new(manager);
    bus.publish(42, &RelayEvent::ForcedLogout)
        .await
        .expect("Failed to publish");

    let Outbound::Text(frame) = within(rx.recv()).await.unwrap() else {
        panic!("expected the forced_logout frame first");
    };
    let frame: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
    assert_eq!(frame["type"], "forced_logout");
    assert_eq!(
        within(rx.recv()).await,
        Some(Outbound::Close(CloseReason::ForcedLogout))
    );

    subscriber.abort();
}
