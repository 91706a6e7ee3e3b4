//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. Los repositorios y los colaboradores externos
//! (gateway de pagos, transporte de OTP) se inyectan como traits.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::environment::{EnvironmentConfig, OtpTransport};
use crate::middleware::rate_limit::RateLimitState;
use crate::repositories::{
    ClientRepository, MemoryStore, MessageRepository, OtpRepository, PaymentRepository,
    PgClientRepository, PgMessageRepository, PgPaymentRepository, PgRiderRepository,
    PgTripRepository, PgWalletRepository, RiderRepository, TripRepository, WalletRepository,
};
use crate::services::messaging_service::OtpSender;
use crate::services::mpesa_service::PaymentGateway;
use crate::services::otp_service::OtpService;
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub jwt: JwtConfig,
    pub trips: Arc<dyn TripRepository>,
    pub riders: Arc<dyn RiderRepository>,
    pub clients: Arc<dyn ClientRepository>,
    pub wallets: Arc<dyn WalletRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub otp: OtpService,
    pub gateway: Arc<dyn PaymentGateway>,
    pub rate_limit: RateLimitState,
}

/// Colaboradores externos construidos una vez al arrancar
pub struct Collaborators {
    pub gateway: Arc<dyn PaymentGateway>,
    pub otp_sender: Arc<dyn OtpSender>,
    pub otp_store: Arc<dyn OtpRepository>,
}

impl AppState {
    /// Estado respaldado por PostgreSQL
    pub fn with_postgres(pool: PgPool, config: EnvironmentConfig, collaborators: Collaborators) -> Self {
        let otp = otp_service(&config, &collaborators);
        Self {
            jwt: JwtConfig::from(&config),
            rate_limit: RateLimitState::new(&config),
            trips: Arc::new(PgTripRepository::new(pool.clone())),
            riders: Arc::new(PgRiderRepository::new(pool.clone())),
            clients: Arc::new(PgClientRepository::new(pool.clone())),
            wallets: Arc::new(PgWalletRepository::new(pool.clone())),
            messages: Arc::new(PgMessageRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool)),
            otp,
            gateway: collaborators.gateway,
            config,
        }
    }

    /// Estado en memoria (desarrollo sin base de datos y tests)
    pub fn in_memory(
        config: EnvironmentConfig,
        gateway: Arc<dyn PaymentGateway>,
        otp_sender: Arc<dyn OtpSender>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(store, config, gateway, otp_sender)
    }

    /// Estado en memoria sobre un store ya creado
    pub fn with_store(
        store: Arc<MemoryStore>,
        config: EnvironmentConfig,
        gateway: Arc<dyn PaymentGateway>,
        otp_sender: Arc<dyn OtpSender>,
    ) -> Self {
        let collaborators = Collaborators {
            gateway,
            otp_sender,
            otp_store: store.clone(),
        };
        let otp = otp_service(&config, &collaborators);

        Self {
            jwt: JwtConfig::from(&config),
            rate_limit: RateLimitState::new(&config),
            trips: store.clone(),
            riders: store.clone(),
            clients: store.clone(),
            wallets: store.clone(),
            messages: store.clone(),
            payments: store,
            otp,
            gateway: collaborators.gateway,
            config,
        }
    }
}

fn otp_service(config: &EnvironmentConfig, collaborators: &Collaborators) -> OtpService {
    // Con transporte `log` en desarrollo un fallo de entrega no bloquea el alta
    let log_fallback = config.is_development() && config.otp_transport == OtpTransport::Log;
    OtpService::new(
        collaborators.otp_store.clone(),
        collaborators.otp_sender.clone(),
        log_fallback,
    )
}
