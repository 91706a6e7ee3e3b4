use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::otp::OtpSendState;
use crate::models::rider::{Rider, RiderProfileChanges};
use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait RiderRepository: Send + Sync {
    /// Registrar; teléfono o email duplicado devuelve `Conflict`
    async fn insert(&self, rider: &Rider) -> AppResult<()>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rider>>;
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Rider>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Rider>>;
    async fn mark_verified(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Rider>>;
    /// Reservar el envío solo si la contabilidad sigue siendo `previous`;
    /// `false` si otro envío se adelantó
    async fn record_otp_sent(&self, id: Uuid, previous: &OtpSendState, next: &OtpSendState) -> AppResult<bool>;
    async fn update_profile(
        &self,
        id: Uuid,
        changes: RiderProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Rider>>;
}

pub struct PgRiderRepository {
    pool: PgPool,
}

impl PgRiderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Traducir violaciones de unicidad a `Conflict`
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    match e.as_database_error().and_then(|d| d.code()) {
        Some(code) if code == "23505" => AppError::Conflict(message.to_string()),
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl RiderRepository for PgRiderRepository {
    async fn insert(&self, rider: &Rider) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO riders (
                id, phone, email, first_name, last_name, password_hash, is_verified,
                otp_sends_in_window, subscription_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(rider.id)
        .bind(&rider.phone)
        .bind(&rider.email)
        .bind(&rider.first_name)
        .bind(&rider.last_name)
        .bind(&rider.password_hash)
        .bind(rider.is_verified)
        .bind(rider.otp_sends_in_window)
        .bind(rider.subscription_active)
        .bind(rider.created_at.unwrap_or(rider.updated_at))
        .bind(rider.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Rider with this phone or email already exists"))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>("SELECT * FROM riders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rider)
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>("SELECT * FROM riders WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rider)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>("SELECT * FROM riders WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rider)
    }

    async fn mark_verified(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>(
            "UPDATE riders SET is_verified = TRUE, updated_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rider)
    }

    async fn record_otp_sent(&self, id: Uuid, previous: &OtpSendState, next: &OtpSendState) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE riders
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
        changes: RiderProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>(
            r#"
            UPDATE riders SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                vehicle_type = COALESCE($4, vehicle_type),
                number_plate = COALESCE($5, number_plate),
                vehicle_make = COALESCE($6, vehicle_make),
                vehicle_model = COALESCE($7, vehicle_model),
                vehicle_image = COALESCE($8, vehicle_image),
                national_id_number = COALESCE($9, national_id_number),
                national_id_image = COALESCE($10, national_id_image),
                driving_license_number = COALESCE($11, driving_license_number),
                driving_license_image = COALESCE($12, driving_license_image),
                emergency_contact = COALESCE($13, emergency_contact),
                emergency_phone = COALESCE($14, emergency_phone),
                updated_at = $15
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.vehicle_type)
        .bind(changes.number_plate)
        .bind(changes.vehicle_make)
        .bind(changes.vehicle_model)
        .bind(changes.vehicle_image)
        .bind(changes.national_id_number)
        .bind(changes.national_id_image)
        .bind(changes.driving_license_number)
        .bind(changes.driving_license_image)
        .bind(changes.emergency_contact)
        .bind(changes.emergency_phone)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rider)
    }
}
