//! Motor del ciclo de vida de viajes
//!
//! Estados: `pending → accepted → in_progress → completed`, con
//! `cancelled` desde cualquier estado no terminal. Cada transición es un
//! único UPDATE condicional en el repositorio; cuando no aplica se vuelve a
//! leer el viaje solo para elegir el error adecuado.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::trip_dto::{
    AvailableTrip, AvailableTripsQuery, CreateTripRequest, LocationUpdateRequest, QuoteRequest,
};
use crate::middleware::auth::Principal;
use crate::models::trip::{GeoPoint, LiveLocation, NewTrip, Place, Trip, TripStatus};
use crate::repositories::{TripActor, TripRepository};
use crate::services::pricing_service::{self, FareQuote};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::validate_coordinates;

const TRIP_UNAVAILABLE: &str = "Trip no longer available";

pub struct TripController {
    trips: Arc<dyn TripRepository>,
    posting_fee: i64,
}

impl TripController {
    pub fn new(state: &AppState) -> Self {
        Self {
            trips: state.trips.clone(),
            posting_fee: state.config.posting_fee,
        }
    }

    /// Crear un viaje en estado `pending`, con precio calculado
    pub async fn create(&self, client_id: Uuid, request: CreateTripRequest) -> AppResult<Trip> {
        request.validate()?;
        request.pickup.check_coordinates()?;
        request.dropoff.check_coordinates()?;

        let details = request.details()?;
        let pickup: Place = request.pickup.into();
        let dropoff: Place = request.dropoff.into();
        let fare = pricing_service::quote(&pickup, &dropoff, request.offered_price);

        let trip = Trip::new(
            NewTrip {
                client_id,
                service_type: request.service_type,
                pickup,
                dropoff,
                price: fare.price,
                posting_fee_amount: self.posting_fee,
                details,
            },
            Utc::now(),
        );

        let trip = if request.pay_posting_fee_from_wallet {
            let trip = trip.with_posting_fee_from_wallet();
            self.trips.insert_with_wallet_debit(&trip, self.posting_fee).await?;
            trip
        } else {
            self.trips.insert(&trip).await?;
            trip
        };

        info!(
            "🆕 Trip {} creado ({}, KES {}, fee pagado: {})",
            trip.id,
            trip.service_type.as_str(),
            trip.price,
            trip.posting_fee_paid
        );
        Ok(trip)
    }

    /// Cotizar sin persistir
    pub fn quote(request: QuoteRequest) -> AppResult<FareQuote> {
        request.validate()?;
        request.pickup.check_coordinates()?;
        request.dropoff.check_coordinates()?;

        let pickup: Place = request.pickup.into();
        let dropoff: Place = request.dropoff.into();
        Ok(pricing_service::quote(&pickup, &dropoff, request.offered_price))
    }

    /// Viajes abiertos, más recientes primero; con posición del rider se
    /// ordenan por cercanía aproximada a la recogida
    pub async fn list_available(
        &self,
        rider_id: Uuid,
        query: AvailableTripsQuery,
    ) -> AppResult<Vec<AvailableTrip>> {
        let trips = self.trips.list_open(rider_id).await?;

        let rider_position = match (query.lat, query.lng) {
            (Some(lat), Some(lng)) => {
                validate_coordinates(lat, lng)?;
                Some(GeoPoint { lat, lng })
            }
            _ => None,
        };

        let Some(position) = rider_position else {
            return Ok(trips
                .into_iter()
                .map(|trip| AvailableTrip { trip, distance_to_pickup: None })
                .collect());
        };

        let mut ranked: Vec<(f64, AvailableTrip)> = trips
            .into_iter()
            .map(|trip| {
                let pickup = trip.pickup.point();
                let score = pricing_service::proximity_score(position, pickup);
                let distance = pickup.map(|p| pricing_service::haversine_km(position, p));
                (score, AvailableTrip { trip, distance_to_pickup: distance })
            })
            .collect();

        // sort estable: a igual distancia se conserva el orden por fecha
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(ranked.into_iter().map(|(_, trip)| trip).collect())
    }

    /// Reclamar un viaje; solo un rider puede ganar
    pub async fn accept(&self, rider_id: Uuid, trip_id: Uuid) -> AppResult<Trip> {
        if let Some(trip) = self.trips.try_assign(trip_id, rider_id, Utc::now()).await? {
            info!("✅ Trip {} aceptado por rider {}", trip.id, rider_id);
            return Ok(trip);
        }

        self.require_trip(trip_id).await?;
        warn!("⚔️ Rider {} no pudo aceptar trip {}", rider_id, trip_id);
        Err(AppError::Conflict(TRIP_UNAVAILABLE.to_string()))
    }

    /// Rechazar un viaje abierto; deja de ofrecerse a este rider
    pub async fn reject(&self, rider_id: Uuid, trip_id: Uuid) -> AppResult<Trip> {
        if let Some(trip) = self.trips.add_rejection(trip_id, rider_id, Utc::now()).await? {
            info!("🙅 Rider {} rechazó trip {}", rider_id, trip_id);
            return Ok(trip);
        }

        self.require_trip(trip_id).await?;
        Err(AppError::Conflict(TRIP_UNAVAILABLE.to_string()))
    }

    pub async fn start(&self, rider_id: Uuid, trip_id: Uuid) -> AppResult<Trip> {
        self.apply(
            TripActor::Rider(rider_id),
            trip_id,
            &[TripStatus::Accepted],
            TripStatus::InProgress,
            "start",
        )
        .await
    }

    pub async fn end(&self, rider_id: Uuid, trip_id: Uuid) -> AppResult<Trip> {
        self.apply(
            TripActor::Rider(rider_id),
            trip_id,
            &TripStatus::ENDABLE,
            TripStatus::Completed,
            "end",
        )
        .await
    }

    /// Cancelar: cliente solicitante o rider asignado, antes de terminar
    pub async fn cancel(&self, principal: Principal, trip_id: Uuid) -> AppResult<Trip> {
        self.apply(
            principal.actor(),
            trip_id,
            &TripStatus::CANCELLABLE,
            TripStatus::Cancelled,
            "cancel",
        )
        .await
    }

    /// Última posición del rider asignado (sin historial)
    pub async fn update_location(
        &self,
        rider_id: Uuid,
        trip_id: Uuid,
        request: LocationUpdateRequest,
    ) -> AppResult<Trip> {
        validate_coordinates(request.latitude, request.longitude)?;

        let location = LiveLocation {
            latitude: request.latitude,
            longitude: request.longitude,
            updated_at: Utc::now(),
        };

        match self.trips.update_location(trip_id, rider_id, location).await? {
            Some(trip) => Ok(trip),
            None => {
                self.require_trip(trip_id).await?;
                Err(AppError::Forbidden("Only the assigned rider can update the location".to_string()))
            }
        }
    }

    pub async fn active_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<Trip>> {
        self.trips.list_for_rider(rider_id, &TripStatus::ACTIVE).await
    }

    pub async fn history_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<Trip>> {
        self.trips.list_for_rider(rider_id, &TripStatus::HISTORY).await
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> AppResult<Vec<Trip>> {
        self.trips.list_for_client(client_id).await
    }

    /// Detalle para el cliente solicitante o el rider asignado
    pub async fn get_for_participant(&self, principal: Principal, trip_id: Uuid) -> AppResult<Trip> {
        let trip = self.require_trip(trip_id).await?;
        if !principal.actor().may_act_on(&trip) {
            return Err(AppError::Forbidden("You are not a participant of this trip".to_string()));
        }
        Ok(trip)
    }

    async fn require_trip(&self, trip_id: Uuid) -> AppResult<Trip> {
        self.trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
    }

    async fn apply(
        &self,
        actor: TripActor,
        trip_id: Uuid,
        from: &[TripStatus],
        to: TripStatus,
        operation: &str,
    ) -> AppResult<Trip> {
        if let Some(trip) = self.trips.transition(trip_id, actor, from, to, Utc::now()).await? {
            info!("🔄 Trip {} → {}", trip.id, trip.status);
            return Ok(trip);
        }

        let current = self.require_trip(trip_id).await?;
        if !actor.may_act_on(&current) {
            warn!("🚫 {:?} intentó {} trip {} sin ser participante", actor, operation, trip_id);
            return Err(AppError::Forbidden(format!(
                "Not allowed to {} this trip",
                operation
            )));
        }

        warn!("⚔️ No se puede {} trip {} en estado {}", operation, trip_id, current.status);
        Err(AppError::Conflict(format!(
            "Cannot {} a trip that is {}",
            operation, current.status
        )))
    }
}
