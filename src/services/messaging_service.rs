//! Entrega de códigos OTP
//!
//! El transporte es un colaborador inyectado: WhatsApp vía UltraMsg en
//! producción, o solo logs en desarrollo.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::EnvironmentConfig;
use crate::utils::errors::{upstream_error, AppError, AppResult};
use crate::utils::validation::mask_phone;

const ULTRAMSG_BASE_URL: &str = "https://api.ultramsg.com";

/// Transporte de códigos de un solo uso
#[async_trait]
pub trait OtpSender: Send + Sync {
    /// Entregar `code` al teléfono normalizado `phone`
    async fn send_otp(&self, phone: &str, code: &str) -> AppResult<()>;

    /// Nombre para logs
    fn name(&self) -> &'static str;
}

pub fn otp_message(code: &str) -> String {
    format!("Your RiderGo OTP is: *{}*", code)
}

#[derive(Debug, Serialize)]
struct UltraMsgChatRequest<'a> {
    token: &'a str,
    to: &'a str,
    body: String,
}

/// WhatsApp vía UltraMsg
pub struct WhatsAppOtpSender {
    client: reqwest::Client,
    instance_id: String,
    token: String,
}

impl WhatsAppOtpSender {
    pub fn new(instance_id: String, token: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            instance_id,
            token,
        })
    }

    /// Construir desde la configuración; requiere instancia y token
    pub fn from_config(config: &EnvironmentConfig) -> AppResult<Self> {
        match (&config.ultramsg_instance_id, &config.ultramsg_token) {
            (Some(instance_id), Some(token)) => Self::new(
                instance_id.clone(),
                token.clone(),
                Duration::from_secs(config.upstream_timeout_secs),
            ),
            _ => Err(AppError::Internal(
                "ULTRAMSG_INSTANCE_ID and ULTRAMSG_TOKEN are required for the whatsapp transport".to_string(),
            )),
        }
    }
}

#[async_trait]
impl OtpSender for WhatsAppOtpSender {
    async fn send_otp(&self, phone: &str, code: &str) -> AppResult<()> {
        let url = format!("{}/{}/messages/chat", ULTRAMSG_BASE_URL, self.instance_id);
        let payload = UltraMsgChatRequest {
            token: &self.token,
            to: phone,
            body: otp_message(code),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| upstream_error("WhatsApp", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("❌ WhatsApp OTP failed for {}: {} {}", mask_phone(phone), status, body);
            return Err(upstream_error("WhatsApp", format!("status {}", status)));
        }

        info!("📨 WhatsApp OTP sent to {}", mask_phone(phone));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "whatsapp"
    }
}

/// Escribe el código en los logs (solo desarrollo)
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send_otp(&self, phone: &str, code: &str) -> AppResult<()> {
        info!("📟 OTP para {}: {}", mask_phone(phone), code);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_sender_requires_credentials() {
        let config = EnvironmentConfig::default();
        assert!(WhatsAppOtpSender::from_config(&config).is_err());

        let config = EnvironmentConfig {
            ultramsg_instance_id: Some("instance1".into()),
            ultramsg_token: Some("token".into()),
            ..EnvironmentConfig::default()
        };
        assert!(WhatsAppOtpSender::from_config(&config).is_ok());
    }

    #[test]
    fn test_message_contains_code() {
        assert!(otp_message("482913").contains("482913"));
    }
}
