use async_trait::async_trait;

use crate::models::otp::OtpRecord;
use crate::utils::errors::AppResult;

/// Almacén de códigos pendientes, uno por teléfono
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Guardar el código, invalidando cualquier anterior del mismo teléfono
    async fn replace(&self, record: &OtpRecord) -> AppResult<()>;
    async fn find(&self, phone: &str) -> AppResult<Option<OtpRecord>>;
    /// Borrar el código si coincide; `true` solo para el primer consumidor
    async fn consume(&self, phone: &str, code: &str) -> AppResult<bool>;
    async fn purge(&self, phone: &str) -> AppResult<()>;
}
