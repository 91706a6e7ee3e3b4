//! Cálculo de tarifas
//!
//! Funciones puras: distancia de gran círculo entre recogida y destino y
//! tarifa en KES enteros. Sin coordenadas completas la tarifa es 0 y se usa
//! la oferta del cliente.

use serde::Serialize;

use crate::models::trip::{GeoPoint, Place};

/// Radio terrestre medio en km
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Tarifa base en KES
pub const BASE_FARE: f64 = 100.0;
/// KES por km recorrido
pub const PER_KM_RATE: f64 = 50.0;
/// Tarifa mínima en KES
pub const MINIMUM_FARE: i64 = 150;
/// Distancia asignada a viajes sin coordenadas al ordenar por cercanía
pub const UNKNOWN_PROXIMITY: f64 = 9999.0;

/// Resultado de cotizar un viaje
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FareQuote {
    pub distance_km: Option<f64>,
    pub price: i64,
    pub estimated: bool,
}

/// Distancia haversine en km
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Tarifa para una distancia: max(150, ceil(100 + km * 50))
pub fn fare_for_distance(distance_km: f64) -> i64 {
    let raw = (BASE_FARE + distance_km.max(0.0) * PER_KM_RATE).ceil() as i64;
    raw.max(MINIMUM_FARE)
}

/// Estimar la tarifa a partir de las cuatro coordenadas opcionales
pub fn estimate_fare(
    pickup_lat: Option<f64>,
    pickup_lng: Option<f64>,
    dropoff_lat: Option<f64>,
    dropoff_lng: Option<f64>,
) -> i64 {
    match (pickup_lat, pickup_lng, dropoff_lat, dropoff_lng) {
        (Some(plat), Some(plng), Some(dlat), Some(dlng)) => fare_for_distance(haversine_km(
            GeoPoint { lat: plat, lng: plng },
            GeoPoint { lat: dlat, lng: dlng },
        )),
        _ => 0,
    }
}

/// Cotizar un viaje; sin coordenadas se toma la oferta del cliente (o 0)
pub fn quote(pickup: &Place, dropoff: &Place, offered_price: Option<i64>) -> FareQuote {
    match (pickup.point(), dropoff.point()) {
        (Some(from), Some(to)) => {
            let distance = haversine_km(from, to);
            FareQuote {
                distance_km: Some(distance),
                price: fare_for_distance(distance),
                estimated: true,
            }
        }
        _ => FareQuote {
            distance_km: None,
            price: offered_price.unwrap_or(0).max(0),
            estimated: false,
        },
    }
}

/// Distancia planar aproximada (al cuadrado) para ordenar viajes cercanos
pub fn proximity_score(rider: GeoPoint, pickup: Option<GeoPoint>) -> f64 {
    match pickup {
        Some(p) => (p.lat - rider.lat).powi(2) + (p.lng - rider.lng).powi(2),
        None => UNKNOWN_PROXIMITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(lat: f64, lng: f64) -> Place {
        Place {
            address: "somewhere".into(),
            latitude: Some(lat),
            longitude: Some(lng),
        }
    }

    #[test]
    fn test_nairobi_cbd_to_south_b_fare() {
        let quote = quote(&place(-1.2921, 36.8219), &place(-1.3032, 36.8442), None);
        let distance = quote.distance_km.unwrap();

        assert!(distance > 2.7 && distance < 2.8, "distance was {}", distance);
        assert_eq!(quote.price, 239);
        assert!(quote.estimated);
    }

    #[test]
    fn test_minimum_fare_for_zero_distance() {
        assert_eq!(fare_for_distance(0.0), MINIMUM_FARE);
        assert_eq!(estimate_fare(Some(-1.0), Some(36.0), Some(-1.0), Some(36.0)), 150);
    }

    #[test]
    fn test_fare_is_monotonic_in_distance() {
        let mut previous = 0;
        for step in 0..400 {
            let fare = fare_for_distance(step as f64 * 0.25);
            assert!(fare >= previous);
            previous = fare;
        }
    }

    #[test]
    fn test_missing_coordinate_yields_zero() {
        assert_eq!(estimate_fare(Some(-1.29), None, Some(-1.30), Some(36.84)), 0);
    }

    #[test]
    fn test_quote_falls_back_to_offer() {
        let pickup = Place { address: "Kilimani".into(), latitude: None, longitude: None };
        let dropoff = place(-1.30, 36.84);

        assert_eq!(quote(&pickup, &dropoff, Some(300)).price, 300);
        assert_eq!(quote(&pickup, &dropoff, None).price, 0);
        assert!(!quote(&pickup, &dropoff, None).estimated);
    }

    #[test]
    fn test_proximity_puts_unknown_pickups_last() {
        let rider = GeoPoint { lat: -1.29, lng: 36.82 };
        let near = proximity_score(rider, Some(GeoPoint { lat: -1.291, lng: 36.821 }));
        let far = proximity_score(rider, Some(GeoPoint { lat: -1.40, lng: 36.90 }));

        assert!(near < far);
        assert!(far < proximity_score(rider, None));
    }
}
