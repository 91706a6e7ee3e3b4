//! Control de suscripción de riders
//!
//! Un rider puede operar viajes durante los 7 días posteriores a su alta, o
//! mientras tenga una suscripción activa y no vencida. La evaluación es un
//! predicado puro: no modifica al rider.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::rider::Rider;

/// Duración del periodo de prueba en días
pub const TRIAL_DAYS: i64 = 7;

/// Motivo por el que se permite operar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessGrant {
    Trial,
    Subscribed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow(AccessGrant),
    Deny,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow(_))
    }
}

/// Estado de suscripción expuesto al rider
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatus {
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_trial_active: bool,
    pub trial_expires_at: Option<DateTime<Utc>>,
    pub can_operate: bool,
}

/// Fin del periodo de prueba; sin fecha de alta no hay prueba
pub fn trial_window_end(created_at: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    created_at.map(|created| created + Duration::days(TRIAL_DAYS))
}

/// Evaluar el acceso a partir del estado bruto del rider
pub fn evaluate(
    created_at: Option<DateTime<Utc>>,
    subscription_active: bool,
    subscription_expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> GateDecision {
    if let Some(trial_end) = trial_window_end(created_at) {
        if now < trial_end {
            return GateDecision::Allow(AccessGrant::Trial);
        }
    }

    match subscription_expires_at {
        Some(expires_at) if subscription_active && expires_at > now => {
            GateDecision::Allow(AccessGrant::Subscribed)
        }
        _ => GateDecision::Deny,
    }
}

pub fn evaluate_rider(rider: &Rider, now: DateTime<Utc>) -> GateDecision {
    evaluate(
        rider.created_at,
        rider.subscription_active,
        rider.subscription_expires_at,
        now,
    )
}

pub fn status_for(rider: &Rider, now: DateTime<Utc>) -> SubscriptionStatus {
    let trial_expires_at = trial_window_end(rider.created_at);
    let is_trial_active = trial_expires_at.map(|end| now < end).unwrap_or(false);
    let active = rider.subscription_active
        && rider.subscription_expires_at.map(|exp| exp > now).unwrap_or(false);

    SubscriptionStatus {
        active,
        expires_at: rider.subscription_expires_at,
        is_trial_active,
        trial_expires_at,
        can_operate: evaluate_rider(rider, now).is_allowed(),
    }
}
