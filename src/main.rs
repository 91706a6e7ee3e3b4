use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use ridergo_backend::cache::{CacheConfig, RedisClient};
use ridergo_backend::config::database::DatabaseConfig;
use ridergo_backend::config::environment::{EnvironmentConfig, OtpTransport};
use ridergo_backend::database::DatabaseConnection;
use ridergo_backend::repositories::{MemoryStore, OtpRepository};
use ridergo_backend::services::{LogOtpSender, MpesaClient, OtpSender, PaymentGateway, WhatsAppOtpSender};
use ridergo_backend::state::{AppState, Collaborators};
use ridergo_backend::build_router;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    let level = if config.is_development() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🏍️ RiderGo Backend");
    info!("==================");
    info!("🌍 Entorno: {}", config.environment);

    let gateway: Arc<dyn PaymentGateway> = Arc::new(MpesaClient::from_config(&config)?);
    let otp_sender = otp_sender(&config)?;

    let state = match config.database_url.clone() {
        Some(url) => {
            let db = DatabaseConnection::new(&DatabaseConfig::new(url))
                .await
                .map_err(|e| {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    e
                })?;
            let collaborators = Collaborators {
                gateway,
                otp_sender,
                otp_store: otp_store(&config).await?,
            };
            AppState::with_postgres(db.pool().clone(), config.clone(), collaborators)
        }
        None if config.is_production() => {
            return Err(anyhow!("DATABASE_URL is required in production"));
        }
        None => {
            warn!("⚠️ DATABASE_URL no definida: almacenamiento en memoria");
            AppState::in_memory(config.clone(), gateway, otp_sender)
        }
    };

    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en {}", config.server_url());
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("🚕 Trips:     /api/trips (create, quote, available, accept, reject, start, end, cancel, location, messages)");
    info!("🏍️ Rider:     /api/rider (register, verify, login, resend-otp, profile, subscription)");
    info!("👤 Client:    /api/client (register, login, verify, resend-otp, profile, trips)");
    info!("👛 Wallet:    /api/wallet (load, balance, transactions, topup)");
    info!("💳 Payments:  /api/payments (initiate, callback)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            e
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Transporte de OTP según `OTP_TRANSPORT`
fn otp_sender(config: &EnvironmentConfig) -> Result<Arc<dyn OtpSender>> {
    match config.otp_transport {
        OtpTransport::WhatsApp => Ok(Arc::new(WhatsAppOtpSender::from_config(config)?)),
        OtpTransport::Log if config.is_production() => {
            Err(anyhow!("OTP_TRANSPORT=log is not allowed in production"))
        }
        OtpTransport::Log => {
            warn!("⚠️ OTP_TRANSPORT=log: los códigos solo se escriben en el log");
            Ok(Arc::new(LogOtpSender))
        }
    }
}

/// Redis si está configurado; si no, OTP en memoria
async fn otp_store(config: &EnvironmentConfig) -> Result<Arc<dyn OtpRepository>> {
    match &config.redis_url {
        Some(url) => {
            let client = RedisClient::new(CacheConfig::new(url.clone())).await?;
            info!("✅ Redis conectado exitosamente");
            Ok(Arc::new(client))
        }
        None => {
            warn!("⚠️ REDIS_URL no definida: OTP en memoria");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
