//! Message Repository Implementation
//!
//! PostgreSQL implementation of message persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{ChatMessage, MessageRepository, NewChatMessage};
use crate::shared::error::AppError;

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    sender_id: i64,
    recipient_id: Option<i64>,
    trip_id: Option<i64>,
    text: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            trip_id: self.trip_id,
            text: self.text,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: &NewChatMessage) -> Result<ChatMessage, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (sender_id, recipient_id, trip_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sender_id, recipient_id, trip_id, text, is_read, created_at
            "#,
        )
        .bind(message.sender_id)
        .bind(message.recipient_id())
        .bind(message.trip_id())
        .bind(&message.text)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }
}
