//! Configuración de cache
//!
//! Este módulo contiene la configuración del almacén Redis de códigos OTP.

use serde::{Deserialize, Serialize};

/// Vigencia de un código OTP en segundos
pub const OTP_TTL_SECONDS: u64 = 5 * 60;

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub key_prefix: String,
    pub otp_ttl: u64,
}

impl CacheConfig {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "ridergo".to_string(),
            otp_ttl: OTP_TTL_SECONDS,
        }
    }
}
