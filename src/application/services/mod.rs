//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **TokenVerifier**: bearer token validation (JWT)
//! - **MessageService**: message write path, triggers the relay
//! - **Relay**: recipient resolution and notification fan-out

pub mod auth_service;
pub mod message_service;
pub mod relay;

// Re-export auth service types
pub use auth_service::{AuthError, AuthUser, Claims, JwtTokenVerifier, TokenVerifier, ADMIN_ROLE};

// Re-export message service types
pub use message_service::{CreateMessageDto, MessageError, MessageService};

// Re-export relay types
pub use relay::{EventBus, Relay, RelayError};
