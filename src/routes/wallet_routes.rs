use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::payment_controller::PaymentController;
use crate::controllers::wallet_controller::WalletController;
use crate::dto::common::ApiResponse;
use crate::dto::payment_dto::{PaymentInitiatedResponse, WalletTopUpRequest};
use crate::dto::wallet_dto::{LoadWalletRequest, WalletBalance};
use crate::middleware::auth::{require_client, AuthenticatedClient};
use crate::models::wallet::{Wallet, WalletTransaction};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_wallet_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/load", post(load_wallet))
        .route("/balance", get(wallet_balance))
        .route("/transactions", get(wallet_transactions))
        .route("/topup", post(top_up_wallet))
        .route_layer(from_fn_with_state(state, require_client))
}

async fn load_wallet(
    State(state): State<AppState>,
    Extension(AuthenticatedClient(client)): Extension<AuthenticatedClient>,
    Json(request): Json<LoadWalletRequest>,
) -> Result<Json<ApiResponse<Wallet>>, AppError> {
    let controller = WalletController::new(&state);
    let wallet = controller.load(client.id, request).await?;
    Ok(Json(ApiResponse::success_with_message(wallet, "Wallet loaded")))
}

async fn wallet_balance(
    State(state): State<AppState>,
    Extension(AuthenticatedClient(client)): Extension<AuthenticatedClient>,
) -> Result<Json<ApiResponse<WalletBalance>>, AppError> {
    let controller = WalletController::new(&state);
    Ok(Json(ApiResponse::success(controller.balance(client.id).await?)))
}

async fn wallet_transactions(
    State(state): State<AppState>,
    Extension(AuthenticatedClient(client)): Extension<AuthenticatedClient>,
) -> Result<Json<ApiResponse<Vec<WalletTransaction>>>, AppError> {
    let controller = WalletController::new(&state);
    Ok(Json(ApiResponse::success(controller.transactions(client.id).await?)))
}

async fn top_up_wallet(
    State(state): State<AppState>,
    Extension(AuthenticatedClient(client)): Extension<AuthenticatedClient>,
    Json(request): Json<WalletTopUpRequest>,
) -> Result<Json<ApiResponse<PaymentInitiatedResponse>>, AppError> {
    let controller = PaymentController::new(&state);
    let response = controller.initiate_wallet_top_up(&client, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        response,
        "Payment request sent. Complete it on your phone",
    )))
}
