//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Los valores por defecto corresponden a un entorno de desarrollo local.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Transporte usado para entregar los códigos OTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpTransport {
    /// WhatsApp vía UltraMsg
    WhatsApp,
    /// Solo logs (desarrollo)
    Log,
}

impl FromStr for OtpTransport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whatsapp" => Ok(OtpTransport::WhatsApp),
            "log" => Ok(OtpTransport::Log),
            other => Err(anyhow::anyhow!("OTP_TRANSPORT desconocido: {}", other)),
        }
    }
}

/// Credenciales y endpoints de M-Pesa (Daraja)
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub short_code: String,
    pub passkey: String,
    pub callback_url: String,
    pub account_reference: String,
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub upstream_timeout_secs: u64,
    pub mpesa: MpesaConfig,
    pub otp_transport: OtpTransport,
    pub ultramsg_instance_id: Option<String>,
    pub ultramsg_token: Option<String>,
    // Reglas comerciales (KES, sin decimales)
    pub subscription_price: i64,
    pub subscription_days: i64,
    pub posting_fee: i64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 5000,
            host: "0.0.0.0".to_string(),
            jwt_secret: "dev-secret-change-in-production".to_string(),
            jwt_expiration: 30 * 24 * 60 * 60,
            cors_origins: vec!["*".to_string()],
            rate_limit_requests: 60,
            rate_limit_window: 60,
            database_url: None,
            redis_url: None,
            upstream_timeout_secs: 15,
            mpesa: MpesaConfig {
                base_url: "https://sandbox.safaricom.co.ke".to_string(),
                consumer_key: String::new(),
                consumer_secret: String::new(),
                short_code: "174379".to_string(),
                passkey: String::new(),
                callback_url: "http://localhost:5000/api/payments/callback".to_string(),
                account_reference: "RIDERGO".to_string(),
            },
            otp_transport: OtpTransport::Log,
            ultramsg_instance_id: None,
            ultramsg_token: None,
            subscription_price: 100,
            subscription_days: 30,
            posting_fee: 100,
        }
    }
}

/// Leer una variable opcional y parsearla
fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} inválido: {}", key, e)),
        _ => Ok(None),
    }
}

fn string_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl EnvironmentConfig {
    /// Cargar la configuración desde el entorno sobre los valores por defecto
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let otp_transport = match string_var("OTP_TRANSPORT") {
            Some(raw) => raw.parse().context("OTP_TRANSPORT")?,
            None => defaults.otp_transport,
        };

        let config = Self {
            environment: string_var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            host: string_var("HOST").unwrap_or(defaults.host),
            jwt_secret: string_var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration: parse_var("JWT_EXPIRATION")?.unwrap_or(defaults.jwt_expiration),
            cors_origins: string_var("CORS_ORIGINS")
                .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_requests: parse_var("RATE_LIMIT_REQUESTS")?
                .unwrap_or(defaults.rate_limit_requests),
            rate_limit_window: parse_var("RATE_LIMIT_WINDOW")?
                .unwrap_or(defaults.rate_limit_window),
            database_url: string_var("DATABASE_URL"),
            redis_url: string_var("REDIS_URL"),
            upstream_timeout_secs: parse_var("UPSTREAM_TIMEOUT_SECS")?
                .unwrap_or(defaults.upstream_timeout_secs),
            mpesa: MpesaConfig {
                base_url: string_var("MPESA_BASE_URL").unwrap_or(defaults.mpesa.base_url),
                consumer_key: string_var("MPESA_CONSUMER_KEY").unwrap_or_default(),
                consumer_secret: string_var("MPESA_CONSUMER_SECRET").unwrap_or_default(),
                short_code: string_var("MPESA_SHORTCODE").unwrap_or(defaults.mpesa.short_code),
                passkey: string_var("MPESA_PASSKEY").unwrap_or_default(),
                callback_url: string_var("MPESA_CALLBACK_URL")
                    .unwrap_or(defaults.mpesa.callback_url),
                account_reference: string_var("MPESA_ACCOUNT_REFERENCE")
                    .unwrap_or(defaults.mpesa.account_reference),
            },
            otp_transport,
            ultramsg_instance_id: string_var("ULTRAMSG_INSTANCE_ID"),
            ultramsg_token: string_var("ULTRAMSG_TOKEN"),
            subscription_price: parse_var("SUBSCRIPTION_PRICE")?
                .unwrap_or(defaults.subscription_price),
            subscription_days: parse_var("SUBSCRIPTION_DAYS")?
                .unwrap_or(defaults.subscription_days),
            posting_fee: parse_var("POSTING_FEE")?.unwrap_or(defaults.posting_fee),
        };

        if config.is_production() && config.jwt_secret == Self::default().jwt_secret {
            anyhow::bail!("JWT_SECRET must be set in production");
        }

        Ok(config)
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Mensaje mostrado cuando la suscripción del rider venció
    pub fn subscription_required_message(&self) -> String {
        format!(
            "Subscription expired. Please pay KES {} to continue.",
            self.subscription_price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_development() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert_eq!(config.subscription_price, 100);
        assert_eq!(config.subscription_days, 30);
        assert_eq!(config.server_url(), "0.0.0.0:5000");
    }

    #[test]
    fn test_otp_transport_parsing() {
        assert_eq!("WhatsApp".parse::<OtpTransport>().unwrap(), OtpTransport::WhatsApp);
        assert_eq!("log".parse::<OtpTransport>().unwrap(), OtpTransport::Log);
        assert!("pigeon".parse::<OtpTransport>().is_err());
    }

    #[test]
    fn test_subscription_message_mentions_price() {
        let config = EnvironmentConfig::default();
        assert!(config.subscription_required_message().contains("KES 100"));
    }
}
