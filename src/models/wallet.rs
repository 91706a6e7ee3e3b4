//! Modelo de Wallet
//!
//! Saldo y libro de movimientos de un cliente. Los importes son KES enteros.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub client_id: Uuid,
    pub balance: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(client_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            balance: 0,
            last_transaction_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            other => Err(AppError::Internal(format!("Unknown wallet direction '{}'", other))),
        }
    }
}

/// Movimiento del libro (solo se añaden)
#[derive(Debug, Clone, Serialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub direction: Direction,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct WalletTransactionRow {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub direction: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<WalletTransactionRow> for WalletTransaction {
    type Error = AppError;

    fn try_from(row: WalletTransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            wallet_id: row.wallet_id,
            amount: row.amount,
            direction: row.direction.parse()?,
            reference: row.reference,
            created_at: row.created_at,
        })
    }
}
