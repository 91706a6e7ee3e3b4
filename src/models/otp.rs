//! Modelo de OTP
//!
//! Registro efímero de un código de un solo uso, indexado por teléfono
//! normalizado, y la contabilidad de envíos por cuenta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Código pendiente para un teléfono
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub phone: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Contabilidad de envíos (cooldown y ventana horaria)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OtpSendState {
    pub last_sent_at: Option<DateTime<Utc>>,
    pub window_started_at: Option<DateTime<Utc>>,
    pub sends_in_window: i32,
}
