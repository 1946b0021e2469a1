//! Participant Repository Implementation
//!
//! Reads trip membership from `trips` and `trip_participants`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{ParticipantRepository, UserId};
use crate::shared::error::AppError;

pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    /// Organizer plus every participant whose request was accepted.
    async fn accepted_participants(&self, trip_id: i64) -> Result<Vec<UserId>, AppError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT organizer_id AS user_id FROM trips WHERE id = $1
            UNION
            SELECT user_id FROM trip_participants
            WHERE trip_id = $1 AND status = 'accepted'
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    async fn is_accepted_participant(
        &self,
        trip_id: i64,
        user_id: UserId,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM trips WHERE id = $1 AND organizer_id = $2
                UNION ALL
                SELECT 1 FROM trip_participants
                WHERE trip_id = $1 AND user_id = $2 AND status = 'accepted'
            )
            "#,
        )
        .bind(trip_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
