use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::message::{Message, MessageRow};
use crate::utils::errors::AppResult;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: &Message) -> AppResult<()>;
    /// Orden de creación ascendente
    async fn list_for_trip(&self, trip_id: Uuid) -> AppResult<Vec<Message>>;
}

pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, trip_id, sender, text, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.trip_id)
        .bind(message.sender.as_str())
        .bind(&message.text)
        .bind(message.read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE trip_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }
}
