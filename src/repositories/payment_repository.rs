//! Repositorio de pagos
//!
//! La liquidación de un callback se hace en una única transacción cuya
//! primera escritura es el número de recibo (clave primaria): un segundo
//! callback con el mismo recibo no inserta nada y no aplica ningún efecto.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::payment::{
    extended_expiry, PaymentIntent, PaymentIntentRow, PaymentStatus, Settlement, SettlementOutcome,
    SettlementTarget,
};
use crate::repositories::wallet_repository::credit_wallet;
use crate::utils::errors::{not_found_error, AppResult};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn record_intent(&self, intent: &PaymentIntent) -> AppResult<()>;
    async fn find_by_checkout(&self, checkout_request_id: &str) -> AppResult<Option<PaymentIntent>>;
    async fn mark_failed(
        &self,
        checkout_request_id: &str,
        result_code: i32,
        result_desc: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>;
    /// Aplicar el pago como máximo una vez por recibo
    async fn settle(&self, settlement: &Settlement) -> AppResult<SettlementOutcome>;
}

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn record_intent(&self, intent: &PaymentIntent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, checkout_request_id, merchant_request_id, purpose, account_id,
                phone, amount, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(intent.id)
        .bind(&intent.checkout_request_id)
        .bind(&intent.merchant_request_id)
        .bind(intent.purpose.as_str())
        .bind(intent.account_id)
        .bind(&intent.phone)
        .bind(intent.amount)
        .bind(intent.status.as_str())
        .bind(intent.created_at)
        .bind(intent.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_checkout(&self, checkout_request_id: &str) -> AppResult<Option<PaymentIntent>> {
        let row = sqlx::query_as::<_, PaymentIntentRow>(
            "SELECT * FROM payments WHERE checkout_request_id = $1",
        )
        .bind(checkout_request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentIntent::try_from).transpose()
    }

    async fn mark_failed(
        &self,
        checkout_request_id: &str,
        result_code: i32,
        result_desc: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, result_code = $3, result_desc = $4, updated_at = $5
            WHERE checkout_request_id = $1 AND status = $6
            "#,
        )
        .bind(checkout_request_id)
        .bind(PaymentStatus::Failed.as_str())
        .bind(result_code)
        .bind(result_desc)
        .bind(now)
        .bind(PaymentStatus::Initiated.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn settle(&self, settlement: &Settlement) -> AppResult<SettlementOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO payment_receipts (
                receipt_number, checkout_request_id, purpose, account_id, amount, phone, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (receipt_number) DO NOTHING
            "#,
        )
        .bind(&settlement.receipt)
        .bind(&settlement.checkout_request_id)
        .bind(settlement.target.purpose().as_str())
        .bind(settlement.target.account_id())
        .bind(settlement.amount)
        .bind(&settlement.phone)
        .bind(settlement.now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SettlementOutcome::AlreadyProcessed);
        }

        match settlement.target {
            SettlementTarget::Subscription { rider_id, days } => {
                let current: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
                    "SELECT subscription_expires_at FROM riders WHERE id = $1 FOR UPDATE",
                )
                .bind(rider_id)
                .fetch_optional(&mut *tx)
                .await?;

                let Some((current_expiry,)) = current else {
                    tx.rollback().await?;
                    return Err(not_found_error("Rider", &rider_id.to_string()));
                };

                let expires_at = extended_expiry(current_expiry, settlement.now, days);

                sqlx::query(
                    r#"
                    UPDATE riders
                    SET subscription_active = TRUE, subscription_expires_at = $2,
                        last_payment_ref = $3, updated_at = $4
                    WHERE id = $1
                    "#,
                )
                .bind(rider_id)
                .bind(expires_at)
                .bind(&settlement.receipt)
                .bind(settlement.now)
                .execute(&mut *tx)
                .await?;
            }
            SettlementTarget::WalletTopUp { client_id } => {
                credit_wallet(
                    &mut tx,
                    client_id,
                    settlement.amount,
                    Some(&settlement.receipt),
                    settlement.now,
                )
                .await?;
            }
        }

        if let Some(checkout_request_id) = &settlement.checkout_request_id {
            sqlx::query(
                r#"
                UPDATE payments
                SET status = $2, receipt_number = $3, result_code = 0, updated_at = $4
                WHERE checkout_request_id = $1
                "#,
            )
            .bind(checkout_request_id)
            .bind(PaymentStatus::Completed.as_str())
            .bind(&settlement.receipt)
            .bind(settlement.now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(SettlementOutcome::Applied)
    }
}
