//! Cuentas de rider: alta con verificación OTP, login y perfil

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::client_dto::PhoneRequest;
use crate::dto::common::{ApiResponse, AuthResponse};
use crate::dto::rider_dto::{
    RegisterRiderRequest, RiderLoginRequest, RiderRegistered, UpdateRiderProfileRequest,
    VerifyRiderRequest,
};
use crate::models::rider::{NewRider, Rider};
use crate::repositories::RiderRepository;
use crate::services::otp_service::{register_send, send_already_claimed, OtpService};
use crate::services::subscription_service::{status_for, SubscriptionStatus};
use crate::state::AppState;
use crate::utils::errors::{conflict_error, AppError, AppResult};
use crate::utils::jwt::{generate_token, JwtConfig, PrincipalRole};
use crate::utils::validation::normalize_phone;

pub struct RiderController {
    riders: Arc<dyn RiderRepository>,
    otp: OtpService,
    jwt: JwtConfig,
}

impl RiderController {
    pub fn new(state: &AppState) -> Self {
        Self {
            riders: state.riders.clone(),
            otp: state.otp.clone(),
            jwt: state.jwt.clone(),
        }
    }

    pub async fn register(
        &self,
        request: RegisterRiderRequest,
    ) -> AppResult<ApiResponse<RiderRegistered>> {
        request.validate()?;
        let phone = normalize_phone(&request.phone)?;
        let email = request.email.trim().to_lowercase();

        if self.riders.find_by_phone(&phone).await?.is_some() {
            return Err(conflict_error("Rider", "phone", &phone));
        }
        if self.riders.find_by_email(&email).await?.is_some() {
            return Err(conflict_error("Rider", "email", &email));
        }

        let password_hash = hash(&request.password, DEFAULT_COST)
            .map_err(|e| AppError::Hash(format!("Error hashing password: {}", e)))?;

        let now = Utc::now();
        let rider = Rider::new(
            NewRider {
                phone,
                email,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                password_hash,
            },
            now,
        );
        self.riders.insert(&rider).await?;

        // el envío del alta cuenta para el throttle
        self.send_code(&rider).await?;

        info!("🏍️ Rider {} registrado, pendiente de verificación", rider.id);
        Ok(ApiResponse::success_with_message(
            RiderRegistered { rider_id: rider.id },
            "Registration successful. Enter the code sent to your phone",
        ))
    }

    pub async fn verify(&self, request: VerifyRiderRequest) -> AppResult<AuthResponse<Rider>> {
        request.validate()?;
        let rider = self.find(request.rider_id).await?;

        let now = Utc::now();
        self.otp.verify(&rider.phone, request.otp.trim(), now).await?;

        let rider = self
            .riders
            .mark_verified(rider.id, now)
            .await?
            .ok_or_else(|| AppError::NotFound("Rider not found".to_string()))?;

        info!("✅ Rider {} verificado", rider.id);
        self.session(rider)
    }

    /// Login con email y contraseña; solo cuentas verificadas
    pub async fn login(&self, request: RiderLoginRequest) -> AppResult<AuthResponse<Rider>> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let rider = self
            .riders
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        let valid = verify(&request.password, &rider.password_hash)
            .map_err(|e| AppError::Hash(format!("Error verifying password: {}", e)))?;
        if !valid {
            warn!("🔒 Contraseña incorrecta para rider {}", rider.id);
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        if !rider.is_verified {
            return Err(AppError::Forbidden(
                "Account not verified. Please verify your phone number".to_string(),
            ));
        }

        self.session(rider)
    }

    pub async fn resend_otp(&self, request: PhoneRequest) -> AppResult<ApiResponse<()>> {
        request.validate()?;
        let phone = normalize_phone(&request.phone)?;

        let rider = self
            .riders
            .find_by_phone(&phone)
            .await?
            .ok_or_else(|| AppError::NotFound("Rider not found".to_string()))?;

        if rider.is_verified {
            return Err(AppError::BadRequest("Account already verified".to_string()));
        }

        self.send_code(&rider).await?;
        Ok(ApiResponse::message("A new code has been sent"))
    }

    /// Reserva el hueco del throttle antes de enviar
    async fn send_code(&self, rider: &Rider) -> AppResult<()> {
        let now = Utc::now();
        let previous = rider.otp_send_state();
        let sends = register_send(previous, now)?;
        if !self.riders.record_otp_sent(rider.id, &previous, &sends).await? {
            return Err(send_already_claimed());
        }
        self.otp.issue(&rider.phone, now).await
    }

    /// El perfil no pasa por el control de suscripción
    pub async fn update_profile(
        &self,
        rider_id: Uuid,
        request: UpdateRiderProfileRequest,
    ) -> AppResult<Rider> {
        request.validate()?;
        self.riders
            .update_profile(rider_id, request.into(), Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("Rider not found".to_string()))
    }

    pub fn subscription_status(rider: &Rider) -> SubscriptionStatus {
        status_for(rider, Utc::now())
    }

    async fn find(&self, rider_id: Uuid) -> AppResult<Rider> {
        self.riders
            .find_by_id(rider_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rider not found".to_string()))
    }

    fn session(&self, rider: Rider) -> AppResult<AuthResponse<Rider>> {
        let token = generate_token(rider.id, PrincipalRole::Rider, &self.jwt)?;
        Ok(AuthResponse {
            token,
            account: rider,
        })
    }
}
