use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::client::{Client, ClientProfileChanges};
use crate::models::otp::OtpSendState;
use crate::utils::errors::AppResult;

#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Devuelve el cliente y si fue creado en esta llamada
    async fn find_or_create_by_phone(&self, phone: &str, now: DateTime<Utc>) -> AppResult<(Client, bool)>;
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Client>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Client>>;
    /// Reservar el envío solo si la contabilidad sigue siendo `previous`;
    /// `false` si otro envío se adelantó
    async fn record_otp_sent(&self, id: Uuid, previous: &OtpSendState, next: &OtpSendState) -> AppResult<bool>;
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ClientProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Client>>;
}

pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn find_or_create_by_phone(&self, phone: &str, now: DateTime<Utc>) -> AppResult<(Client, bool)> {
        let candidate = Client::new(phone.to_string(), now);

        let created = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (id, phone, otp_sends_in_window, created_at, updated_at)
            VALUES ($1, $2, 0, $3, $3)
            ON CONFLICT (phone) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(candidate.id)
        .bind(phone)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(client) = created {
            return Ok((client, true));
        }

        let existing = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE phone = $1")
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;
        Ok((existing, false))
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    async fn record_otp_sent(&self, id: Uuid, previous: &OtpSendState, next: &OtpSendState) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET otp_last_sent_at = $2, otp_window_started_at = $3, otp_sends_in_window = $4
            WHERE id = $1
              AND otp_last_sent_at IS NOT DISTINCT FROM $5
              AND otp_window_started_at IS NOT DISTINCT FROM $6
              AND otp_sends_in_window = $7
            "#,
        )
        .bind(id)
        .bind(next.last_sent_at)
        .bind(next.window_started_at)
        .bind(next.sends_in_window)
        .bind(previous.last_sent_at)
        .bind(previous.window_started_at)
        .bind(previous.sends_in_window)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ClientProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                home_address = COALESCE($4, home_address),
                work_address = COALESCE($5, work_address),
                profile_photo = COALESCE($6, profile_photo),
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.home_address)
        .bind(changes.work_address)
        .bind(changes.profile_photo)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }
}
