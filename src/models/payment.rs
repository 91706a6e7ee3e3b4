//! Modelo de pagos M-Pesa
//!
//! Un `PaymentIntent` se registra cuando el gateway acepta un STK push. El
//! callback posterior lo liquida (`Settlement`) una sola vez por recibo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Qué se está pagando
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    Subscription,
    WalletTopUp,
}

impl PaymentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPurpose::Subscription => "subscription",
            PaymentPurpose::WalletTopUp => "wallet_top_up",
        }
    }
}

impl FromStr for PaymentPurpose {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(PaymentPurpose::Subscription),
            "wallet_top_up" => Ok(PaymentPurpose::WalletTopUp),
            other => Err(AppError::Internal(format!("Unknown payment purpose '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Initiated,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(PaymentStatus::Initiated),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AppError::Internal(format!("Unknown payment status '{}'", other))),
        }
    }
}

/// STK push aceptado por el gateway
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub checkout_request_id: String,
    pub merchant_request_id: Option<String>,
    pub purpose: PaymentPurpose,
    pub account_id: Uuid,
    pub phone: String,
    pub amount: i64,
    pub status: PaymentStatus,
    pub receipt_number: Option<String>,
    pub result_code: Option<i32>,
    pub result_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct PaymentIntentRow {
    pub id: Uuid,
    pub checkout_request_id: String,
    pub merchant_request_id: Option<String>,
    pub purpose: String,
    pub account_id: Uuid,
    pub phone: String,
    pub amount: i64,
    pub status: String,
    pub receipt_number: Option<String>,
    pub result_code: Option<i32>,
    pub result_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentIntentRow> for PaymentIntent {
    type Error = AppError;

    fn try_from(row: PaymentIntentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            checkout_request_id: row.checkout_request_id,
            merchant_request_id: row.merchant_request_id,
            purpose: row.purpose.parse()?,
            account_id: row.account_id,
            phone: row.phone,
            amount: row.amount,
            status: row.status.parse()?,
            receipt_number: row.receipt_number,
            result_code: row.result_code,
            result_desc: row.result_desc,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Datos para registrar un intento aceptado
#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub checkout_request_id: String,
    pub merchant_request_id: Option<String>,
    pub purpose: PaymentPurpose,
    pub account_id: Uuid,
    pub phone: String,
    pub amount: i64,
}

impl PaymentIntent {
    pub fn new(new: NewPaymentIntent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            checkout_request_id: new.checkout_request_id,
            merchant_request_id: new.merchant_request_id,
            purpose: new.purpose,
            account_id: new.account_id,
            phone: new.phone,
            amount: new.amount,
            status: PaymentStatus::Initiated,
            receipt_number: None,
            result_code: None,
            result_desc: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Efecto de un pago confirmado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementTarget {
    Subscription { rider_id: Uuid, days: i64 },
    WalletTopUp { client_id: Uuid },
}

impl SettlementTarget {
    pub fn purpose(&self) -> PaymentPurpose {
        match self {
            SettlementTarget::Subscription { .. } => PaymentPurpose::Subscription,
            SettlementTarget::WalletTopUp { .. } => PaymentPurpose::WalletTopUp,
        }
    }

    pub fn account_id(&self) -> Uuid {
        match self {
            SettlementTarget::Subscription { rider_id, .. } => *rider_id,
            SettlementTarget::WalletTopUp { client_id } => *client_id,
        }
    }
}

/// Liquidación de un callback exitoso, idempotente por `receipt`
#[derive(Debug, Clone)]
pub struct Settlement {
    pub checkout_request_id: Option<String>,
    pub receipt: String,
    pub amount: i64,
    pub phone: String,
    pub target: SettlementTarget,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Applied,
    AlreadyProcessed,
}

/// Nueva fecha de vencimiento: se extiende desde la mayor entre ahora y el
/// vencimiento vigente
pub fn extended_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    days: i64,
) -> DateTime<Utc> {
    let base = match current {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };
    base + chrono::Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_extension_starts_from_now_when_lapsed() {
        let now = Utc::now();
        let expired = now - Duration::days(3);
        assert_eq!(extended_expiry(Some(expired), now, 30), now + Duration::days(30));
        assert_eq!(extended_expiry(None, now, 30), now + Duration::days(30));
    }

    #[test]
    fn test_extension_stacks_on_active_subscription() {
        let now = Utc::now();
        let active = now + Duration::days(10);
        assert_eq!(extended_expiry(Some(active), now, 30), now + Duration::days(40));
    }
}
