use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoadWalletRequest {
    #[validate(range(min = 1, max = 1000000))]
    pub amount: i64,
    #[validate(length(max = 64))]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletBalance {
    pub balance: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
}
