use axum::{
    extract::{rejection::JsonRejection, State},
    middleware::from_fn_with_state,
    routing::post,
    Extension, Json, Router,
};
use tracing::warn;

use crate::controllers::payment_controller::PaymentController;
use crate::dto::common::ApiResponse;
use crate::dto::payment_dto::{
    CallbackAck, InitiatePaymentRequest, MpesaCallbackEnvelope, PaymentInitiatedResponse,
};
use crate::middleware::auth::{require_rider, AuthenticatedRider};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_payment_router(state: AppState) -> Router<AppState> {
    let rider_routes = Router::new()
        .route("/initiate", post(initiate_payment))
        .route_layer(from_fn_with_state(state, require_rider));

    // webhook del gateway, sin autenticación
    Router::new()
        .route("/callback", post(mpesa_callback))
        .merge(rider_routes)
}

async fn initiate_payment(
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

async fn mpesa_callback(
    State(state): State<AppState>,
    payload: Result<Json<MpesaCallbackEnvelope>, JsonRejection>,
) -> Result<Json<CallbackAck>, AppError> {
    let Json(envelope) = payload.map_err(|rejection| {
        warn!("⚠️ Callback M-Pesa malformado: {}", rejection.body_text());
        AppError::BadRequest("Malformed callback payload".to_string())
    })?;

    let controller = PaymentController::new(&state);
    Ok(Json(controller.handle_callback(envelope).await?))
}
