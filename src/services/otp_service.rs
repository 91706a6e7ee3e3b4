//! Política de códigos OTP
//!
//! - un código vigente por teléfono; emitir uno nuevo invalida el anterior
//! - vigencia de 5 minutos
//! - un solo uso: la verificación correcta lo borra
//! - por cuenta: 2 minutos entre envíos y como máximo 3 envíos por hora

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::otp::{OtpRecord, OtpSendState};
use crate::repositories::OtpRepository;
use crate::services::messaging_service::OtpSender;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::mask_phone;

pub const OTP_EXPIRY_MINUTES: i64 = 5;
pub const RESEND_COOLDOWN_MINUTES: i64 = 2;
pub const SEND_WINDOW_MINUTES: i64 = 60;
pub const MAX_SENDS_PER_WINDOW: i32 = 3;

/// Código numérico de 6 dígitos
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Comprobar el throttle de envíos y devolver el estado tras este envío
pub fn register_send(state: OtpSendState, now: DateTime<Utc>) -> AppResult<OtpSendState> {
    if let Some(last) = state.last_sent_at {
        let elapsed = now - last;
        let cooldown = Duration::minutes(RESEND_COOLDOWN_MINUTES);
        if elapsed < cooldown {
            let wait = (cooldown - elapsed).num_seconds().max(1);
            return Err(AppError::RateLimited(format!(
                "Please wait {} seconds before requesting a new code",
                wait
            )));
        }
    }

    let (window_started_at, sends) = match state.window_started_at {
        Some(start) if now - start < Duration::minutes(SEND_WINDOW_MINUTES) => {
            (start, state.sends_in_window)
        }
        _ => (now, 0),
    };

    if sends >= MAX_SENDS_PER_WINDOW {
        return Err(AppError::RateLimited(
            "Too many OTP requests. Please try again later".to_string(),
        ));
    }

    Ok(OtpSendState {
        last_sent_at: Some(now),
        window_started_at: Some(window_started_at),
        sends_in_window: sends + 1,
    })
}

/// Otro envío para la misma cuenta reservó el hueco antes
pub fn send_already_claimed() -> AppError {
    AppError::RateLimited("A code was just sent. Please wait before requesting a new one".to_string())
}

#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpRepository>,
    sender: Arc<dyn OtpSender>,
    log_fallback: bool,
}

impl OtpService {
    /// `log_fallback`: si la entrega falla, aceptar el código igualmente y
    /// dejarlo en los logs (desarrollo)
    pub fn new(store: Arc<dyn OtpRepository>, sender: Arc<dyn OtpSender>, log_fallback: bool) -> Self {
        Self {
            store,
            sender,
            log_fallback,
        }
    }

    /// Enviar un código nuevo y guardarlo solo si la entrega se aceptó
    pub async fn issue(&self, phone: &str, now: DateTime<Utc>) -> AppResult<()> {
        let code = generate_code();

        if let Err(e) = self.sender.send_otp(phone, &code).await {
            if !self.log_fallback {
                return Err(e);
            }
            warn!(
                "⚠️ Entrega por {} falló para {}; OTP de desarrollo: {}",
                self.sender.name(),
                mask_phone(phone),
                code
            );
        }

        let record = OtpRecord {
            phone: phone.to_string(),
            code,
            expires_at: now + Duration::minutes(OTP_EXPIRY_MINUTES),
        };
        self.store.replace(&record).await?;

        info!("🔐 OTP emitido para {}", mask_phone(phone));
        Ok(())
    }

    /// Verificar y consumir el código
    pub async fn verify(&self, phone: &str, code: &str, now: DateTime<Utc>) -> AppResult<()> {
        let record = self
            .store
            .find(phone)
            .await?
            .ok_or_else(|| AppError::NotFound("No pending OTP for this phone. Please request a new code".to_string()))?;

        if record.is_expired(now) {
            self.store.purge(phone).await?;
            return Err(AppError::BadRequest("OTP has expired".to_string()));
        }

        if record.code != code.trim() {
            return Err(AppError::BadRequest("Invalid OTP".to_string()));
        }

        if !self.store.consume(phone, &record.code).await? {
            return Err(AppError::NotFound("OTP already used".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;
    use crate::services::messaging_service::LogOtpSender;
    use async_trait::async_trait;

    struct FailingSender;

    #[async_trait]
    impl OtpSender for FailingSender {
        async fn send_otp(&self, _phone: &str, _code: &str) -> AppResult<()> {
            Err(crate::utils::errors::upstream_error("WhatsApp", "unreachable"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    const PHONE: &str = "+254712345678";

    #[test]
    fn test_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_cooldown_between_sends() {
        let now = Utc::now();
        let state = register_send(OtpSendState::default(), now).unwrap();

        let err = register_send(state, now + Duration::seconds(90)).unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));

        assert!(register_send(state, now + Duration::minutes(2)).is_ok());
    }

    #[test]
    fn test_three_sends_per_hour() {
        let start = Utc::now();
        let mut state = OtpSendState::default();
        for i in 0..3 {
            state = register_send(state, start + Duration::minutes(3 * i)).unwrap();
        }
        assert_eq!(state.sends_in_window, 3);

        let err = register_send(state, start + Duration::minutes(30)).unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));

        let reset = register_send(state, start + Duration::minutes(61)).unwrap();
        assert_eq!(reset.sends_in_window, 1);
    }

    #[tokio::test]
    async fn test_verify_is_single_use() {
        let store = Arc::new(MemoryStore::new());
        let service = OtpService::new(store.clone(), Arc::new(LogOtpSender), false);
        let now = Utc::now();

        service.issue(PHONE, now).await.unwrap();
        let code = store.find(PHONE).await.unwrap().unwrap().code;

        service.verify(PHONE, &code, now).await.unwrap();
        let second = service.verify(PHONE, &code, now).await.unwrap_err();
        assert!(matches!(second, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_new_code_invalidates_previous() {
        let store = Arc::new(MemoryStore::new());
        let service = OtpService::new(store.clone(), Arc::new(LogOtpSender), false);
        let now = Utc::now();

        service.issue(PHONE, now).await.unwrap();
        let first = store.find(PHONE).await.unwrap().unwrap().code;
        service.issue(PHONE, now).await.unwrap();
        let second = store.find(PHONE).await.unwrap().unwrap().code;

        if first != second {
            assert!(service.verify(PHONE, &first, now).await.is_err());
        }
        assert!(service.verify(PHONE, &second, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_code_is_purged() {
        let store = Arc::new(MemoryStore::new());
        let service = OtpService::new(store.clone(), Arc::new(LogOtpSender), false);
        let now = Utc::now();

        service.issue(PHONE, now).await.unwrap();
        let code = store.find(PHONE).await.unwrap().unwrap().code;

        let err = service.verify(PHONE, &code, now + Duration::minutes(6)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(store.find(PHONE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_delivery_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = OtpService::new(store.clone(), Arc::new(FailingSender), false);

        let err = service.issue(PHONE, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
        assert!(store.find(PHONE).await.unwrap().is_none());

        let lenient = OtpService::new(store.clone(), Arc::new(FailingSender), true);
        lenient.issue(PHONE, Utc::now()).await.unwrap();
        assert!(store.find(PHONE).await.unwrap().is_some());
    }
}
