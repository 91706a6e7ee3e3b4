//! Mensajes de chat de un viaje

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::AppError;
use crate::utils::jwt::PrincipalRole;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub sender: PrincipalRole,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(trip_id: Uuid, sender: PrincipalRole, text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            sender,
            text,
            read: false,
            created_at: now,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub sender: String,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let sender = match row.sender.as_str() {
            "client" => PrincipalRole::Client,
            "rider" => PrincipalRole::Rider,
            other => return Err(AppError::Internal(format!("Unknown message sender '{}'", other))),
        };

        Ok(Self {
            id: row.id,
            trip_id: row.trip_id,
            sender,
            text: row.text,
            read: row.read,
            created_at: row.created_at,
        })
    }
}
