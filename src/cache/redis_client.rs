use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::collections::HashMap;
use tracing::{debug, info};

use super::CacheConfig;
use crate::models::otp::OtpRecord;
use crate::repositories::OtpRepository;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::mask_phone;

/// Borra el código solo si coincide, en una única operación del servidor
const CONSUME_SCRIPT: &str = r#"
if redis.call('HGET', KEYS[1], 'code') == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Cliente Redis con connection manager y operaciones async
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: CacheConfig,
}

impl RedisClient {
    /// Crear nuevo cliente Redis
    pub async fn new(config: CacheConfig) -> Result<Self> {
        info!("🔗 Conectando a Redis: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.clone())?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis conectado exitosamente");

        Ok(Self { manager, config })
    }

    /// Generar clave con prefijo
    fn make_key(&self, prefix: &str, identifier: &str) -> String {
        format!("{}:{}:{}", self.config.key_prefix, prefix, identifier)
    }

    /// Clave del código pendiente de un teléfono
    pub fn otp_key(&self, phone: &str) -> String {
        self.make_key("otp", phone)
    }
}

#[async_trait]
impl OtpRepository for RedisClient {
    async fn replace(&self, record: &OtpRecord) -> AppResult<()> {
        let key = self.otp_key(&record.phone);
        let mut conn = self.manager.clone();

        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(
                &key,
                &[
                    ("code", record.code.clone()),
                    ("expires_at", record.expires_at.to_rfc3339()),
                ],
            )
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.config.otp_ttl)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!("💾 OTP guardado para {} (TTL: {}s)", mask_phone(&record.phone), self.config.otp_ttl);
        Ok(())
    }

    async fn find(&self, phone: &str) -> AppResult<Option<OtpRecord>> {
        let mut conn = self.manager.clone();
        let fields: HashMap<String, String> = conn.hgetall(self.otp_key(phone)).await?;

        let (Some(code), Some(expires_at)) = (fields.get("code"), fields.get("expires_at")) else {
            return Ok(None);
        };

        let expires_at = DateTime::parse_from_rfc3339(expires_at)
            .map_err(|e| AppError::Internal(format!("Invalid OTP expiry in cache: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(OtpRecord {
            phone: phone.to_string(),
            code: code.clone(),
            expires_at,
        }))
    }

    async fn consume(&self, phone: &str, code: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        let deleted: i64 = Script::new(CONSUME_SCRIPT)
            .key(self.otp_key(phone))
            .arg(code)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    async fn purge(&self, phone: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.del(self.otp_key(phone)).await?;
        Ok(())
    }
}
