use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::payment_controller::PaymentController;
use crate::controllers::rider_controller::RiderController;
use crate::dto::client_dto::PhoneRequest;
use crate::dto::common::{ApiResponse, AuthResponse};
use crate::dto::payment_dto::{InitiatePaymentRequest, PaymentInitiatedResponse};
use crate::dto::rider_dto::{
    RegisterRiderRequest, RiderLoginRequest, RiderRegistered, UpdateRiderProfileRequest,
    VerifyRiderRequest,
};
use crate::middleware::auth::{require_rider, AuthenticatedRider};
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::models::rider::Rider;
use crate::services::subscription_service::SubscriptionStatus;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_rider_router(state: AppState) -> Router<AppState> {
    let account_routes = Router::new()
        .route("/register", post(register))
        .route("/verify", post(verify))
        .route("/login", post(login))
        .route("/resend-otp", post(resend_otp))
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    let authenticated_routes = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/subscription/status", get(subscription_status))
        .route("/subscription/pay", post(pay_subscription))
        .route_layer(from_fn_with_state(state, require_rider));

    Router::new().merge(account_routes).merge(authenticated_routes)
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRiderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RiderRegistered>>), AppError> {
    let controller = RiderController::new(&state);
    let response = controller.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRiderRequest>,
) -> Result<Json<ApiResponse<AuthResponse<Rider>>>, AppError> {
    let controller = RiderController::new(&state);
    let session = controller.verify(request).await?;
    Ok(Json(ApiResponse::success_with_message(session, "Phone number verified")))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<RiderLoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse<Rider>>>, AppError> {
    let controller = RiderController::new(&state);
    let session = controller.login(request).await?;
    Ok(Json(ApiResponse::success(session)))
}

async fn resend_otp(
    State(state): State<AppState>,
    Json(request): Json<PhoneRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = RiderController::new(&state);
    Ok(Json(controller.resend_otp(request).await?))
}

async fn get_profile(
    Extension(AuthenticatedRider(rider)): Extension<AuthenticatedRider>,
) -> Json<ApiResponse<Rider>> {
    Json(ApiResponse::success(rider))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthenticatedRider(rider)): Extension<AuthenticatedRider>,
    Json(request): Json<UpdateRiderProfileRequest>,
) -> Result<Json<ApiResponse<Rider>>, AppError> {
    let controller = RiderController::new(&state);
    let rider = controller.update_profile(rider.id, request).await?;
    Ok(Json(ApiResponse::success_with_message(rider, "Profile updated")))
}

async fn subscription_status(
    Extension(AuthenticatedRider(rider)): Extension<AuthenticatedRider>,
) -> Json<ApiResponse<SubscriptionStatus>> {
    Json(ApiResponse::success(RiderController::subscription_status(&rider)))
}

/// Alias de `POST /api/payments/initiate`
async fn pay_subscription(
    State(state): State<AppState>,
    Extension(AuthenticatedRider(rider)): Extension<AuthenticatedRider>,
    request: Option<Json<InitiatePaymentRequest>>,
) -> Result<Json<ApiResponse<PaymentInitiatedResponse>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let controller = PaymentController::new(&state);
    let response = controller.initiate_subscription(&rider, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        response,
        "Payment request sent. Complete it on your phone",
    )))
}
