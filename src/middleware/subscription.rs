//! Middleware de suscripción
//!
//! Aplica el control de suscripción a las operaciones de viaje del rider.
//! Debe montarse después de `require_rider`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::warn;

use crate::{
    middleware::auth::AuthenticatedRider,
    services::subscription_service::{evaluate_rider, GateDecision},
    state::AppState,
    utils::errors::AppError,
};

pub async fn subscription_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let AuthenticatedRider(rider) = request
        .extensions()
        .get::<AuthenticatedRider>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

    match evaluate_rider(&rider, Utc::now()) {
        GateDecision::Allow(_) => Ok(next.run(request).await),
        GateDecision::Deny => {
            warn!("🚫 Rider {} sin suscripción activa", rider.id);
            Err(AppError::Forbidden(state.config.subscription_required_message()))
        }
    }
}
