//! HTTP Layer
//!
//! Thin REST entry points next to the WebSocket relay.

pub mod handlers;
pub mod routes;
