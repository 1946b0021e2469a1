//! # Domain Layer
//!
//! Core types of the notification relay, independent of HTTP, WebSocket and
//! database concerns.
//!
//! ## Structure
//!
//! - **entities**: persisted records the relay reads (messages, trip membership)
//! - **events**: notification frames pushed to live connections

pub mod entities;
pub mod events;

// Re-export commonly used types
pub use entities::*;
pub use events::RelayEvent;
