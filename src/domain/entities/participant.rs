//! Trip participation and repository trait.
//!
//! Maps to the `trips` and `trip_participants` tables.

use async_trait::async_trait;

use super::message::UserId;
use crate::shared::error::AppError;

/// Read access to trip membership.
///
/// The organizer of a trip is treated as an accepted participant. Pending
/// and rejected join requests never count.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// All accepted participants of a trip, organizer included.
    async fn accepted_participants(&self, trip_id: i64) -> Result<Vec<UserId>, AppError>;

    /// Whether the user is the organizer or an accepted participant.
    async fn is_accepted_participant(&self, trip_id: i64, user_id: UserId)
        -> Result<bool, AppError>;
}

