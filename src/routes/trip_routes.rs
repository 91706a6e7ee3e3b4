use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::message_controller::MessageController;
use crate::controllers::trip_controller::TripController;
use crate::dto::common::ApiResponse;
use crate::dto::message_dto::SendMessageRequest;
use crate::dto::trip_dto::{
    AvailableTrip, AvailableTripsQuery, CreateTripRequest, LocationUpdateRequest, QuoteRequest,
};
use crate::middleware::auth::{require_client, require_participant, require_rider, Principal};
use crate::middleware::subscription::subscription_guard;
use crate::models::message::Message;
use crate::models::trip::Trip;
use crate::services::pricing_service::FareQuote;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router(state: AppState) -> Router<AppState> {
    let client_routes = Router::new()
        .route("/", post(create_trip))
        .route("/quote", post(quote_trip))
        .route_layer(from_fn_with_state(state.clone(), require_client));

    // require_rider corre primero y deja el rider para el guard
    let operating_rider_routes = Router::new()
        .route("/available", get(available_trips))
        .route("/:id/accept", post(accept_trip))
        .route("/:id/reject", post(reject_trip))
        .route("/:id/start", post(start_trip))
        .route("/:id/end", post(end_trip))
        .route("/:id/location", post(update_location))
        .route_layer(from_fn_with_state(state.clone(), subscription_guard))
        .route_layer(from_fn_with_state(state.clone(), require_rider));

    let rider_routes = Router::new()
        .route("/mine/active", get(active_trips))
        .route("/mine/history", get(trip_history))
        .route_layer(from_fn_with_state(state.clone(), require_rider));

    let participant_routes = Router::new()
        .route("/:id", get(get_trip))
        .route("/:id/cancel", post(cancel_trip))
        .route("/:id/messages", get(list_messages).post(send_message))
        .route_layer(from_fn_with_state(state, require_participant));

    Router::new()
        .merge(client_routes)
        .merge(operating_rider_routes)
        .merge(rider_routes)
        .merge(participant_routes)
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Trip>>), AppError> {
    let controller = TripController::new(&state);
    let trip = controller.create(principal.id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(trip, "Trip created")),
    ))
}

async fn quote_trip(Json(request): Json<QuoteRequest>) -> Result<Json<ApiResponse<FareQuote>>, AppError> {
    let quote = TripController::quote(request)?;
    Ok(Json(ApiResponse::success(quote)))
}

async fn available_trips(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AvailableTripsQuery>,
) -> Result<Json<ApiResponse<Vec<AvailableTrip>>>, AppError> {
    let controller = TripController::new(&state);
    let trips = controller.list_available(principal.id, query).await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn accept_trip(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(&state);
    let trip = controller.accept(principal.id, id).await?;
    Ok(Json(ApiResponse::success_with_message(trip, "Trip accepted")))
}

async fn reject_trip(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(&state);
    let trip = controller.reject(principal.id, id).await?;
    Ok(Json(ApiResponse::success_with_message(trip, "Trip rejected")))
}

async fn start_trip(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(&state);
    let trip = controller.start(principal.id, id).await?;
    Ok(Json(ApiResponse::success_with_message(trip, "Trip started")))
}

async fn end_trip(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(&state);
    let trip = controller.end(principal.id, id).await?;
    Ok(Json(ApiResponse::success_with_message(trip, "Trip completed")))
}

async fn update_location(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<LocationUpdateRequest>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(&state);
    let trip = controller.update_location(principal.id, id, request).await?;
    Ok(Json(ApiResponse::success(trip)))
}

async fn active_trips(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let controller = TripController::new(&state);
    let trips = controller.active_for_rider(principal.id).await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn trip_history(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let controller = TripController::new(&state);
    let trips = controller.history_for_rider(principal.id).await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn get_trip(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(&state);
    let trip = controller.get_for_participant(principal, id).await?;
    Ok(Json(ApiResponse::success(trip)))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(&state);
    let trip = controller.cancel(principal, id).await?;
    Ok(Json(ApiResponse::success_with_message(trip, "Trip cancelled")))
}

async fn list_messages(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let controller = MessageController::new(&state);
    let messages = controller.list(principal, id).await?;
    Ok(Json(ApiResponse::success(messages)))
}

async fn send_message(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), AppError> {
    let controller = MessageController::new(&state);
    let message = controller.send(principal, id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}
