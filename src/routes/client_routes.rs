use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::client_controller::ClientController;
use crate::controllers::trip_controller::TripController;
use crate::dto::client_dto::{PhoneRequest, UpdateClientProfileRequest, VerifyClientRequest};
use crate::dto::common::{ApiResponse, AuthResponse};
use crate::middleware::auth::{require_client, AuthenticatedClient};
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::models::client::Client;
use crate::models::trip::Trip;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_client_router(state: AppState) -> Router<AppState> {
    let account_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", post(verify))
        .route("/resend-otp", post(resend_otp))
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    let authenticated_routes = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/trips", get(list_trips))
        .route_layer(from_fn_with_state(state, require_client));

    Router::new().merge(account_routes).merge(authenticated_routes)
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<PhoneRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = ClientController::new(&state);
    Ok(Json(controller.register(request).await?))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<PhoneRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = ClientController::new(&state);
    Ok(Json(controller.login(request).await?))
}

async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyClientRequest>,
) -> Result<Json<ApiResponse<AuthResponse<Client>>>, AppError> {
    let controller = ClientController::new(&state);
    let session = controller.verify(request).await?;
    Ok(Json(ApiResponse::success(session)))
}

async fn resend_otp(
    State(state): State<AppState>,
    Json(request): Json<PhoneRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = ClientController::new(&state);
    Ok(Json(controller.resend_otp(request).await?))
}

async fn get_profile(
    Extension(AuthenticatedClient(client)): Extension<AuthenticatedClient>,
) -> Json<ApiResponse<Client>> {
    Json(ApiResponse::success(client))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthenticatedClient(client)): Extension<AuthenticatedClient>,
    Json(request): Json<UpdateClientProfileRequest>,
) -> Result<Json<ApiResponse<Client>>, AppError> {
    let controller = ClientController::new(&state);
    let client = controller.update_profile(client.id, request).await?;
    Ok(Json(ApiResponse::success_with_message(client, "Profile updated")))
}

async fn list_trips(
    State(state): State<AppState>,
    Extension(AuthenticatedClient(client)): Extension<AuthenticatedClient>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let controller = TripController::new(&state);
    let trips = controller.list_for_client(client.id).await?;
    Ok(Json(ApiResponse::success(trips)))
}
