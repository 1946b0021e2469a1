//! # Domain Entities
//!
//! The relay only touches two pieces of persisted state:
//!
//! - **ChatMessage**: a message row, read for its addressing fields
//! - **Participation**: trip membership, used to expand a trip message to
//!   its recipients
//!
//! Repository traits are implemented in the infrastructure layer.

mod message;
mod participant;

pub use message::{
    ChatMessage, MessageRepository, MessageTarget, NewChatMessage, UserId, MAX_MESSAGE_LENGTH,
};
pub use participant::ParticipantRepository;

#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use participant::MockParticipantRepository;
