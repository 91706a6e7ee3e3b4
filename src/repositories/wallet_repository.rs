//! Repositorio del monedero
//!
//! El saldo y su movimiento se escriben siempre en la misma transacción.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::wallet::{Direction, Wallet, WalletTransaction, WalletTransactionRow};
use crate::utils::errors::AppResult;

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Abonar, creando el monedero si no existe
    async fn credit(
        &self,
        client_id: Uuid,
        amount: i64,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Wallet>;

    /// Nunca crea el monedero
    async fn find_by_client(&self, client_id: Uuid) -> AppResult<Option<Wallet>>;

    /// Movimientos, más recientes primero
    async fn transactions(&self, client_id: Uuid) -> AppResult<Vec<WalletTransaction>>;
}

pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Abono dentro de una transacción abierta (también lo usa la liquidación
/// de pagos)
pub(crate) async fn credit_wallet(
    conn: &mut PgConnection,
    client_id: Uuid,
    amount: i64,
    reference: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<Wallet> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (id, client_id, balance, last_transaction_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4, $4)
        ON CONFLICT (client_id) DO UPDATE SET
            balance = wallets.balance + EXCLUDED.balance,
            last_transaction_at = EXCLUDED.last_transaction_at,
            updated_at = EXCLUDED.updated_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(client_id)
    .bind(amount)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (id, wallet_id, amount, direction, reference, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(wallet.id)
    .bind(amount)
    .bind(Direction::Credit.as_str())
    .bind(reference)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(wallet)
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn credit(
        &self,
        client_id: Uuid,
        amount: i64,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Wallet> {
        let mut tx = self.pool.begin().await?;
        let wallet = credit_wallet(&mut tx, client_id, amount, reference.as_deref(), now).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    async fn find_by_client(&self, client_id: Uuid) -> AppResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE client_id = $1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(wallet)
    }

    async fn transactions(&self, client_id: Uuid) -> AppResult<Vec<WalletTransaction>> {
        let rows = sqlx::query_as::<_, WalletTransactionRow>(
            r#"
            SELECT t.* FROM wallet_transactions t
            JOIN wallets w ON w.id = t.wallet_id
            WHERE w.client_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WalletTransaction::try_from).collect()
    }
}
