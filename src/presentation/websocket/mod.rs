//! WebSocket Relay
//!
//! Socket endpoint, auth handshake and the registry of live connections.

pub mod handler;
pub mod handshake;
pub mod messages;
pub mod registry;
pub mod session;

pub use handler::ws_handler;
pub use handshake::{Handshake, HandshakeState, HandshakeStep};
pub use messages::{ClientFrame, CloseReason};
pub use registry::{ConnectionRegistry, ConnectionSender, Outbound};
pub use session::{ConnectionId, ConnectionState};
