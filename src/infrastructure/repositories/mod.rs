//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **MessageRepository** - message inserts and lookups
//! - **ParticipantRepository** - trip membership for group fan-out
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgMessageRepository, PgParticipantRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let message_repo = PgMessageRepository::new(pool.clone());
//!     let participant_repo = PgParticipantRepository::new(pool);
//! }
//! ```

pub mod message_repository;
pub mod participant_repository;

pub use message_repository::PgMessageRepository;
pub use participant_repository::PgParticipantRepository;
