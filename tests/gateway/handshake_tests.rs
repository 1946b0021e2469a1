//! Handshake tests over real sockets

use std::time::Duration;

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;

use crate::common::{
    authenticated, close_code, connect, eventually, send_auth, test_settings, TestApp,
};

#[tokio::test]
async fn test_valid_token_registers_connection_once() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let _socket = authenticated(addr, &app.token(7)).await;

    assert!(app.state.registry.is_online(7));
    assert_eq!(app.state.registry.connections_for(7), 1);
    assert_eq!(app.state.registry.connection_count(), 1);
}

#[tokio::test]
async fn test_invalid_token_is_closed_and_never_registered() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut socket = connect(addr).await;
    send_auth(&mut socket, "forged.token.value").await;

    assert_eq!(close_code(&mut socket).await, Some(4001));
    assert_eq!(app.state.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_expired_token_is_closed_with_invalid_token() {
    let mut settings = test_settings();
    settings.jwt.access_token_expiry_minutes = -10;
    let app = TestApp::with_settings(settings);
    let addr = app.spawn().await;

    let mut socket = connect(addr).await;
    send_auth(&mut socket, &app.token(7)).await;

    assert_eq!(close_code(&mut socket).await, Some(4001));
    assert!(!app.state.registry.is_online(7));
}

#[tokio::test]
async fn test_malformed_first_frame_is_closed() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut socket = connect(addr).await;
    socket
        .send(Message::text(r#"{"type":"subscribe"}"#))
        .await
        .unwrap();

    assert_eq!(close_code(&mut socket).await, Some(4003));
    assert_eq!(app.state.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_binary_first_frame_is_closed() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut socket = connect(addr).await;
    socket
        .send(Message::binary(vec![1u8, 2, 3]))
        .await
        .unwrap();

    assert_eq!(close_code(&mut socket).await, Some(4003));
}

#[tokio::test]
async fn test_silent_connection_times_out() {
    let mut settings = test_settings();
    settings.websocket.auth_timeout_secs = 1;
    let app = TestApp::with_settings(settings);
    let addr = app.spawn().await;

    let mut socket = connect(addr).await;

    assert_eq!(close_code(&mut socket).await, Some(4002));
    assert_eq!(app.state.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_close_before_auth_leaves_no_entry() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut socket = connect(addr).await;
    socket.close(None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.state.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_disconnect_unregisters() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut socket = authenticated(addr, &app.token(3)).await;
    socket.close(None).await.unwrap();

    assert!(eventually(|| !app.state.registry.is_online(3)).await);
}

#[tokio::test]
async fn test_frames_after_auth_are_ignored() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut socket = authenticated(addr, &app.token(3)).await;
    socket.send(Message::text("not json")).await.unwrap();
    socket
        .send(Message::text(r#"{"type":"auth","token":"again"}"#))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.state.registry.connections_for(3), 1);
}
