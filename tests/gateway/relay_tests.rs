//! Fan-out over real sockets

use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use wayzer_relay::domain::RelayEvent;
use wayzer_relay::presentation::websocket::CloseReason;

use crate::common::{authenticated, close_code, eventually, next_json, stays_silent, TestApp};

const QUIET: Duration = Duration::from_millis(300);

#[tokio::test]
async fn test_both_connections_of_a_user_receive_a_broadcast() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let token = app.token(5);

    let mut laptop = authenticated(addr, &token).await;
    let mut phone = authenticated(addr, &token).await;

    let delivered = app
        .state
        .registry
        .send_to_user(5, &RelayEvent::AuthOk { user_id: 5 });
    assert_eq!(delivered, 2);

    assert_eq!(next_json(&mut laptop).await, json!({ "type": "auth_ok", "user_id": 5 }));
    assert_eq!(next_json(&mut phone).await, json!({ "type": "auth_ok", "user_id": 5 }));
    assert!(stays_silent(&mut laptop, QUIET).await);
}

#[tokio::test]
async fn test_message_from_a_reaches_online_b_exactly_once() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut b = authenticated(addr, &app.token(2)).await;
    let mut a = authenticated(addr, &app.token(1)).await;

    let response = app
        .server()
        .post("/api/v1/messages")
        .authorization_bearer(app.token(1))
        .json(&json!({ "recipient_id": 2, "text": "platform 4" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let frame = next_json(&mut b).await;
    assert_eq!(frame["type"], "new_message");
    assert_eq!(frame["message"]["text"], "platform 4");
    assert_eq!(frame["message"]["sender_id"], 1);

    assert!(stays_silent(&mut b, QUIET).await);
    assert!(stays_silent(&mut a, QUIET).await);
}

#[tokio::test]
async fn test_message_to_offline_b_pushes_nothing() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut a = authenticated(addr, &app.token(1)).await;

    app.server()
        .post("/api/v1/messages")
        .authorization_bearer(app.token(1))
        .json(&json!({ "recipient_id": 2, "text": "are you there?" }))
        .await
        .assert_status(StatusCode::CREATED);

    assert!(stays_silent(&mut a, QUIET).await);
    assert_eq!(app.state.registry.connection_count(), 1);
}

#[tokio::test]
async fn test_forced_logout_frame_precedes_close() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut socket = authenticated(addr, &app.token(4)).await;
    app.state.relay.force_logout(4).await.unwrap();

    assert_eq!(next_json(&mut socket).await, json!({ "type": "forced_logout" }));
    assert_eq!(
        close_code(&mut socket).await,
        Some(CloseReason::ForcedLogout.code())
    );
    assert!(eventually(|| !app.state.registry.is_online(4)).await);
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let mut settings = crate::common::test_settings();
    settings.websocket.ping_interval_secs = 1;
    settings.websocket.idle_timeout_secs = 1;
    let app = TestApp::with_settings(settings);
    let addr = app.spawn().await;

    let mut socket = authenticated(addr, &app.token(6)).await;

    // Pongs are only sent while reading, so a parked socket looks idle
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(
        close_code(&mut socket).await,
        Some(CloseReason::IdleTimeout.code())
    );
    assert!(eventually(|| !app.state.registry.is_online(6)).await);
}
