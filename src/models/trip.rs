//! Modelo de Trip
//!
//! Un Trip representa un pedido de transporte de una persona (`ride`) o de
//! mercancía (`delivery`). Este módulo contiene la máquina de estados, las
//! posiciones geográficas y el mapeo a la tabla `trips`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Tipo de servicio, inmutable tras la creación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Delivery,
    Ride,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Delivery => "delivery",
            ServiceType::Ride => "ride",
        }
    }
}

impl FromStr for ServiceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(ServiceType::Delivery),
            "ride" => Ok(ServiceType::Ride),
            other => Err(AppError::Internal(format!("Unknown service type '{}'", other))),
        }
    }
}

/// Estados del viaje
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    AwaitingPayment,
    Assigned,
    Accepted,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Estado con el que se crean los viajes
    pub const INITIAL: TripStatus = TripStatus::Pending;

    /// Estados visibles para riders activos
    pub const ACTIVE: [TripStatus; 2] = [TripStatus::Accepted, TripStatus::InProgress];

    /// Estados del historial
    pub const HISTORY: [TripStatus; 2] = [TripStatus::Completed, TripStatus::Cancelled];

    /// Estados desde los que se puede completar
    pub const ENDABLE: [TripStatus; 2] = [TripStatus::Accepted, TripStatus::InProgress];

    /// Estados desde los que se puede cancelar
    pub const CANCELLABLE: [TripStatus; 6] = [
        TripStatus::Pending,
        TripStatus::AwaitingPayment,
        TripStatus::Assigned,
        TripStatus::Accepted,
        TripStatus::Rejected,
        TripStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Pending => "pending",
            TripStatus::AwaitingPayment => "awaiting_payment",
            TripStatus::Assigned => "assigned",
            TripStatus::Accepted => "accepted",
            TripStatus::Rejected => "rejected",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Sin rider asignado
    pub fn is_open(&self) -> bool {
        matches!(self, TripStatus::Pending | TripStatus::AwaitingPayment)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TripStatus::Pending),
            "awaiting_payment" => Ok(TripStatus::AwaitingPayment),
            "assigned" => Ok(TripStatus::Assigned),
            "accepted" => Ok(TripStatus::Accepted),
            "rejected" => Ok(TripStatus::Rejected),
            "in_progress" => Ok(TripStatus::InProgress),
            "completed" => Ok(TripStatus::Completed),
            "cancelled" => Ok(TripStatus::Cancelled),
            other => Err(AppError::Internal(format!("Unknown trip status '{}'", other))),
        }
    }
}

/// Punto geográfico
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Dirección con coordenadas opcionales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Place {
    pub fn point(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        }
    }
}

/// Última posición reportada por el rider (sin historial)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
}

/// Metadatos específicos del tipo de servicio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TripDetails {
    Delivery {
        package_description: String,
        recipient_name: Option<String>,
        recipient_phone: Option<String>,
        special_instructions: Option<String>,
    },
    Ride {
        passengers: Option<i32>,
        notes: Option<String>,
    },
}

/// Viaje completo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub id: Uuid,
    pub client_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub service_type: ServiceType,
    pub status: TripStatus,
    pub pickup: Place,
    pub dropoff: Place,
    pub current_location: Option<LiveLocation>,
    pub price: i64,
    pub posting_fee_paid: bool,
    pub posting_fee_amount: i64,
    pub client_wallet_used: i64,
    pub extra_wallet_stored: i64,
    pub rider_cash_expected: i64,
    pub details: TripDetails,
    #[serde(skip_serializing)]
    pub rejected_riders: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Datos necesarios para crear un viaje
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub client_id: Uuid,
    pub service_type: ServiceType,
    pub pickup: Place,
    pub dropoff: Place,
    pub price: i64,
    pub posting_fee_amount: i64,
    pub details: TripDetails,
}

impl Trip {
    /// Construir un viaje nuevo en el estado inicial y sin rider
    pub fn new(new: NewTrip, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            rider_id: None,
            service_type: new.service_type,
            status: TripStatus::INITIAL,
            pickup: new.pickup,
            dropoff: new.dropoff,
            current_location: None,
            price: new.price,
            posting_fee_paid: false,
            posting_fee_amount: new.posting_fee_amount,
            client_wallet_used: 0,
            extra_wallet_stored: 0,
            rider_cash_expected: new.price,
            details: new.details,
            rejected_riders: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marcar la tarifa de publicación como pagada desde el monedero
    pub fn with_posting_fee_from_wallet(mut self) -> Self {
        self.posting_fee_paid = true;
        self.client_wallet_used = self.posting_fee_amount;
        self
    }

    pub fn is_requested_by(&self, client_id: Uuid) -> bool {
        self.client_id == client_id
    }

    pub fn is_assigned_to(&self, rider_id: Uuid) -> bool {
        self.rider_id == Some(rider_id)
    }

    pub fn was_rejected_by(&self, rider_id: Uuid) -> bool {
        self.rejected_riders.contains(&rider_id)
    }

    /// Visible en el listado de disponibles para este rider
    pub fn is_available_for(&self, rider_id: Uuid) -> bool {
        self.status == TripStatus::INITIAL && self.rider_id.is_none() && !self.was_rejected_by(rider_id)
    }
}

/// Fila de la tabla `trips`
#[derive(Debug, FromRow)]
pub struct TripRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub service_type: String,
    pub status: String,
    pub pickup_address: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_address: String,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub price: i64,
    pub posting_fee_paid: bool,
    pub posting_fee_amount: i64,
    pub client_wallet_used: i64,
    pub extra_wallet_stored: i64,
    pub rider_cash_expected: i64,
    pub details: Json<TripDetails>,
    pub rejected_riders: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = AppError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let current_location = match (row.current_lat, row.current_lng, row.location_updated_at) {
            (Some(latitude), Some(longitude), Some(updated_at)) => Some(LiveLocation {
                latitude,
                longitude,
                updated_at,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            client_id: row.client_id,
            rider_id: row.rider_id,
            service_type: row.service_type.parse()?,
            status: row.status.parse()?,
            pickup: Place {
                address: row.pickup_address,
                latitude: row.pickup_lat,
                longitude: row.pickup_lng,
            },
            dropoff: Place {
                address: row.dropoff_address,
                latitude: row.dropoff_lat,
                longitude: row.dropoff_lng,
            },
            current_location,
            price: row.price,
            posting_fee_paid: row.posting_fee_paid,
            posting_fee_amount: row.posting_fee_amount,
            client_wallet_used: row.client_wallet_used,
            extra_wallet_stored: row.extra_wallet_stored,
            rider_cash_expected: row.rider_cash_expected,
            details: row.details.0,
            rejected_riders: row.rejected_riders,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Trip {
        Trip::new(
            NewTrip {
                client_id: Uuid::new_v4(),
                service_type: ServiceType::Ride,
                pickup: Place { address: "CBD".into(), latitude: Some(-1.28), longitude: Some(36.82) },
                dropoff: Place { address: "Westlands".into(), latitude: None, longitude: None },
                price: 240,
                posting_fee_amount: 100,
                details: TripDetails::Ride { passengers: Some(1), notes: None },
            },
            now,
        )
    }

    #[test]
    fn test_new_trip_is_open_without_rider() {
        let trip = sample(Utc::now());
        assert_eq!(trip.status, TripStatus::Pending);
        assert!(trip.status.is_open());
        assert!(trip.rider_id.is_none());
        assert_eq!(trip.rider_cash_expected, 240);
        assert!(!trip.posting_fee_paid);
    }

    #[test]
    fn test_rejected_rider_no_longer_sees_trip() {
        let mut trip = sample(Utc::now());
        let rider = Uuid::new_v4();
        assert!(trip.is_available_for(rider));

        trip.rejected_riders.push(rider);
        assert!(!trip.is_available_for(rider));
        assert!(trip.is_available_for(Uuid::new_v4()));
    }

    #[test]
    fn test_status_string_mapping() {
        for status in TripStatus::CANCELLABLE.iter().chain(TripStatus::HISTORY.iter()) {
            assert_eq!(status.as_str().parse::<TripStatus>().unwrap(), *status);
        }
        assert!("lost".parse::<TripStatus>().is_err());
    }

    #[test]
    fn test_details_serialize_with_kind_tag() {
        let details = TripDetails::Delivery {
            package_description: "Documents".into(),
            recipient_name: Some("Wanjiru".into()),
            recipient_phone: None,
            special_instructions: None,
        };
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["kind"], "delivery");
        assert_eq!(value["package_description"], "Documents");
    }
}
