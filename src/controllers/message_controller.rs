use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::message_dto::SendMessageRequest;
use crate::middleware::auth::Principal;
use crate::models::message::Message;
use crate::repositories::{MessageRepository, TripRepository};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

/// Chat de un viaje entre el cliente y el rider asignado
pub struct MessageController {
    trips: Arc<dyn TripRepository>,
    messages: Arc<dyn MessageRepository>,
}

impl MessageController {
    pub fn new(state: &AppState) -> Self {
        Self {
            trips: state.trips.clone(),
            messages: state.messages.clone(),
        }
    }

    pub async fn send(
        &self,
        principal: Principal,
        trip_id: Uuid,
        request: SendMessageRequest,
    ) -> AppResult<Message> {
        request.validate()?;
        self.ensure_participant(principal, trip_id).await?;

        // el remitente sale del token, nunca del cuerpo
        let message = Message::new(trip_id, principal.role, request.text.trim().to_string(), Utc::now());
        self.messages.insert(&message).await?;

        log::info!("💬 Mensaje en trip {} de {}", trip_id, principal.role.as_str());
        Ok(message)
    }

    /// Mensajes en orden de envío
    pub async fn list(&self, principal: Principal, trip_id: Uuid) -> AppResult<Vec<Message>> {
        self.ensure_participant(principal, trip_id).await?;
        self.messages.list_for_trip(trip_id).await
    }

    async fn ensure_participant(&self, principal: Principal, trip_id: Uuid) -> AppResult<()> {
        let trip = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

        if !principal.actor().may_act_on(&trip) {
            return Err(AppError::Forbidden("You are not a participant of this trip".to_string()));
        }
        Ok(())
    }
}
