use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::trip::{Place, ServiceType, Trip, TripDetails};
use crate::utils::errors::{validation_error, AppResult};
use crate::utils::validation::{validate_coordinates, validate_not_empty, validate_phone};

/// Dirección con coordenadas opcionales
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlaceInput {
    #[validate(custom = "validate_not_empty")]
    pub address: String,
    #[serde(alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(alias = "lng")]
    pub longitude: Option<f64>,
}

impl PlaceInput {
    /// Coordenadas dentro de rango cuando están presentes
    pub fn check_coordinates(&self) -> AppResult<()> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => validate_coordinates(lat, lng),
            (Some(lat), None) => validate_coordinates(lat, 0.0),
            (None, Some(lng)) => validate_coordinates(0.0, lng),
            (None, None) => Ok(()),
        }
    }
}

impl From<PlaceInput> for Place {
    fn from(input: PlaceInput) -> Self {
        Place {
            address: input.address.trim().to_string(),
            latitude: input.latitude,
            longitude: input.longitude,
        }
    }
}

/// Crear un viaje o una entrega
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTripRequest {
    pub service_type: ServiceType,
    #[validate]
    pub pickup: PlaceInput,
    #[validate]
    pub dropoff: PlaceInput,
    /// Precio propuesto si no hay coordenadas
    #[validate(range(min = 0))]
    pub offered_price: Option<i64>,
    #[validate(length(max = 500))]
    pub package_description: Option<String>,
    #[validate(length(max = 120))]
    pub recipient_name: Option<String>,
    #[validate(custom = "validate_phone")]
    pub recipient_phone: Option<String>,
    #[validate(length(max = 500))]
    pub special_instructions: Option<String>,
    #[validate(range(min = 1, max = 8))]
    pub passengers: Option<i32>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[serde(default)]
    pub pay_posting_fee_from_wallet: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateTripRequest {
    /// Metadatos según el tipo de servicio
    pub fn details(&self) -> AppResult<TripDetails> {
        match self.service_type {
            ServiceType::Delivery => {
                let package_description = non_blank(self.package_description.clone()).ok_or_else(|| {
                    validation_error("package_description", "Package description is required for deliveries")
                })?;
                Ok(TripDetails::Delivery {
                    package_description,
                    recipient_name: non_blank(self.recipient_name.clone()),
                    recipient_phone: non_blank(self.recipient_phone.clone()),
                    special_instructions: non_blank(self.special_instructions.clone()),
                })
            }
            ServiceType::Ride => Ok(TripDetails::Ride {
                passengers: self.passengers,
                notes: non_blank(self.notes.clone()),
            }),
        }
    }
}

/// Cotizar sin crear el viaje
#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate]
    pub pickup: PlaceInput,
    #[validate]
    pub dropoff: PlaceInput,
    #[validate(range(min = 0))]
    pub offered_price: Option<i64>,
}

/// Posición actual del rider para ordenar por cercanía
#[derive(Debug, Default, Deserialize)]
pub struct AvailableTripsQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Viaje disponible con su distancia aproximada a la recogida
#[derive(Debug, Serialize)]
pub struct AvailableTrip {
    #[serde(flatten)]
    pub trip: Trip,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_to_pickup: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng")]
    pub longitude: f64,
}
