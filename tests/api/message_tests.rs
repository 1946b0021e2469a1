//! Message API Tests
//!
//! The write path persists first and then relays `new_message` to the
//! recipients' live connections.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;

use wayzer_relay::domain::MAX_MESSAGE_LENGTH;
use wayzer_relay::presentation::websocket::{ConnectionId, Outbound};

use crate::common::TestApp;

fn fake_connection(app: &TestApp, user_id: i64) -> mpsc::UnboundedReceiver<Outbound> {
    let (tx, rx) = mpsc::unbounded_channel();
    app.state.registry.register(user_id, ConnectionId::new(), tx);
    rx
}

fn frame(outbound: Outbound) -> serde_json::Value {
    match outbound {
        Outbound::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_direct_message_is_stored_and_relayed() {
    let app = TestApp::new();
    let mut recipient = fake_connection(&app, 2);
    let mut sender = fake_connection(&app, 1);

    let response = app
        .server()
        .post("/api/v1/messages")
        .authorization_bearer(app.token(1))
        .json(&json!({ "recipient_id": 2, "text": "  meet at the station  " }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["sender_id"], 1);
    assert_eq!(body["recipient_id"], 2);
    assert_eq!(body["text"], "meet at the station");
    assert_eq!(app.messages.all().len(), 1);

    let pushed = frame(recipient.try_recv().unwrap());
    assert_eq!(pushed["type"], "new_message");
    assert_eq!(pushed["message"], body);
    assert!(recipient.try_recv().is_err());
    assert!(sender.try_recv().is_err());
}

#[tokio::test]
async fn test_trip_message_reaches_every_other_participant() {
    let app = TestApp::new();
    app.participants.add_trip(7, &[1, 2, 3]);
    let mut organizer = fake_connection(&app, 1);
    let mut second = fake_connection(&app, 2);
    let mut third = fake_connection(&app, 3);
    let mut outsider = fake_connection(&app, 4);

    let response = app
        .server()
        .post("/api/v1/messages")
        .authorization_bearer(app.token(2))
        .json(&json!({ "trip_id": 7, "text": "tickets booked" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(frame(organizer.try_recv().unwrap())["message"]["trip_id"], 7);
    assert_eq!(frame(third.try_recv().unwrap())["type"], "new_message");
    assert!(second.try_recv().is_err());
    assert!(outsider.try_recv().is_err());
}

#[tokio::test]
async fn test_message_to_offline_user_is_still_stored() {
    let app = TestApp::new();

    let response = app
        .server()
        .post("/api/v1/messages")
        .authorization_bearer(app.token(1))
        .json(&json!({ "recipient_id": 99, "text": "ping me when you land" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(app.messages.all().len(), 1);
    assert!(!app.state.registry.is_online(99));
}

#[tokio::test]
async fn test_non_participant_cannot_post_to_trip() {
    let app = TestApp::new();
    app.participants.add_trip(7, &[1, 2]);
    let mut member = fake_connection(&app, 2);

    let response = app
        .server()
        .post("/api/v1/messages")
        .authorization_bearer(app.token(5))
        .json(&json!({ "trip_id": 7, "text": "can I join?" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert!(app.messages.all().is_empty());
    assert!(member.try_recv().is_err());
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let app = TestApp::new();
    let server = app.server();
    let token = app.token(1);

    let bodies = [
        json!({ "recipient_id": 2, "text": "" }),
        json!({ "recipient_id": 2, "trip_id": 7, "text": "both" }),
        json!({ "text": "nobody" }),
        json!({ "recipient_id": 1, "text": "note to self" }),
        json!({ "recipient_id": 0, "text": "nobody home" }),
        json!({ "recipient_id": 2, "text": "a".repeat(MAX_MESSAGE_LENGTH + 1) }),
    ];
    for body in bodies {
        let response = server
            .post("/api/v1/messages")
            .authorization_bearer(token.clone())
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
    assert!(app.messages.all().is_empty());
}

#[tokio::test]
async fn test_length_limit_applies_to_trimmed_text() {
    let app = TestApp::new();
    let text = format!("   {}   ", "a".repeat(MAX_MESSAGE_LENGTH));

    let response = app
        .server()
        .post("/api/v1/messages")
        .authorization_bearer(app.token(1))
        .json(&json!({ "recipient_id": 2, "text": text }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["text"].as_str().unwrap().chars().count(), MAX_MESSAGE_LENGTH);
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();
    let server = app.server();
    let body = json!({ "recipient_id": 2, "text": "hello" });

    server
        .post("/api/v1/messages")
        .json(&body)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .post("/api/v1/messages")
        .authorization_bearer("not-a-jwt")
        .json(&body)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
