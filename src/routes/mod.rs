//! Routers de la API
//!
//! Cada módulo expone `create_x_router(state)`; `build_router` los monta
//! bajo `/api` con las capas comunes.

pub mod client_routes;
pub mod payment_routes;
pub mod rider_routes;
pub mod trip_routes;
pub mod wallet_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_layer;
use crate::state::AppState;

/// Router completo de la aplicación
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/trips", trip_routes::create_trip_router(state.clone()))
        .nest("/api/rider", rider_routes::create_rider_router(state.clone()))
        .nest("/api/client", client_routes::create_client_router(state.clone()))
        .nest("/api/wallet", wallet_routes::create_wallet_router(state.clone()))
        .nest("/api/payments", payment_routes::create_payment_router(state.clone()))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "ridergo-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
