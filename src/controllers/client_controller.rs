//! Cuentas de cliente: acceso sin contraseña por OTP al teléfono

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::client_dto::{PhoneRequest, UpdateClientProfileRequest, VerifyClientRequest};
use crate::dto::common::{ApiResponse, AuthResponse};
use crate::models::client::Client;
use crate::repositories::ClientRepository;
use crate::services::otp_service::{register_send, send_already_claimed, OtpService};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::jwt::{generate_token, JwtConfig, PrincipalRole};
use crate::utils::validation::normalize_phone;

pub struct ClientController {
    clients: Arc<dyn ClientRepository>,
    otp: OtpService,
    jwt: JwtConfig,
}

impl ClientController {
    pub fn new(state: &AppState) -> Self {
        Self {
            clients: state.clients.clone(),
            otp: state.otp.clone(),
            jwt: state.jwt.clone(),
        }
    }

    /// Crear la cuenta si no existe y enviar el código
    pub async fn register(&self, request: PhoneRequest) -> AppResult<ApiResponse<()>> {
        request.validate()?;
        let phone = normalize_phone(&request.phone)?;

        let (client, created) = self.clients.find_or_create_by_phone(&phone, Utc::now()).await?;
        if created {
            info!("👤 Cliente {} creado", client.id);
        }

        self.send_code(&client).await?;
        Ok(ApiResponse::message("Verification code sent"))
    }

    /// La cuenta debe existir
    pub async fn login(&self, request: PhoneRequest) -> AppResult<ApiResponse<()>> {
        request.validate()?;
        let client = self.find_by_phone(&request.phone).await?;

        self.send_code(&client).await?;
        Ok(ApiResponse::message("Verification code sent"))
    }

    pub async fn resend_otp(&self, request: PhoneRequest) -> AppResult<ApiResponse<()>> {
        request.validate()?;
        let client = self.find_by_phone(&request.phone).await?;

        self.send_code(&client).await?;
        Ok(ApiResponse::message("A new code has been sent"))
    }

    pub async fn verify(&self, request: VerifyClientRequest) -> AppResult<AuthResponse<Client>> {
        request.validate()?;
        let client = self.find_by_phone(&request.phone).await?;

        self.otp.verify(&client.phone, request.otp.trim(), Utc::now()).await?;

        let token = generate_token(client.id, PrincipalRole::Client, &self.jwt)?;
        info!("🔓 Cliente {} autenticado", client.id);
        Ok(AuthResponse {
            token,
            account: client,
        })
    }

    pub async fn update_profile(
        &self,
        client_id: Uuid,
        request: UpdateClientProfileRequest,
    ) -> AppResult<Client> {
        request.validate()?;
        self.clients
            .update_profile(client_id, request.into(), Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("Client not found".to_string()))
    }

    async fn find_by_phone(&self, raw_phone: &str) -> AppResult<Client> {
        let phone = normalize_phone(raw_phone)?;
        self.clients
            .find_by_phone(&phone)
            .await?
            .ok_or_else(|| AppError::NotFound("Client not found. Please register first".to_string()))
    }

    async fn send_code(&self, client: &Client) -> AppResult<()> {
        let now = Utc::now();
        let previous = client.otp_send_state();
        let sends = register_send(previous, now)?;
        if !self.clients.record_otp_sent(client.id, &previous, &sends).await? {
            return Err(send_already_claimed());
        }
        self.otp.issue(&client.phone, now).await
    }
}
