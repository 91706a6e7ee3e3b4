//! Modelo de Rider
//!
//! Cuenta del lado que realiza los viajes: contacto, verificación,
//! vehículo/documentación y suscripción.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::otp::OtpSendState;

/// Rider principal - mapea a la tabla riders
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Rider {
    pub id: Uuid,
    pub phone: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub otp_last_sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_window_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_sends_in_window: i32,
    pub vehicle_type: Option<String>,
    pub number_plate: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_image: Option<String>,
    pub national_id_number: Option<String>,
    pub national_id_image: Option<String>,
    pub driving_license_number: Option<String>,
    pub driving_license_image: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub subscription_active: bool,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub last_payment_ref: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Datos para registrar un rider
#[derive(Debug, Clone)]
pub struct NewRider {
    pub phone: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Campos editables del perfil (vehículo y documentación)
#[derive(Debug, Clone, Default)]
pub struct RiderProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub vehicle_type: Option<String>,
    pub number_plate: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_image: Option<String>,
    pub national_id_number: Option<String>,
    pub national_id_image: Option<String>,
    pub driving_license_number: Option<String>,
    pub driving_license_image: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
}

impl Rider {
    pub fn new(new: NewRider, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone: new.phone,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            is_verified: false,
            otp_last_sent_at: None,
            otp_window_started_at: None,
            otp_sends_in_window: 0,
            vehicle_type: None,
            number_plate: None,
            vehicle_make: None,
            vehicle_model: None,
            vehicle_image: None,
            national_id_number: None,
            national_id_image: None,
            driving_license_number: None,
            driving_license_image: None,
            emergency_contact: None,
            emergency_phone: None,
            subscription_active: false,
            subscription_expires_at: None,
            last_payment_ref: None,
            created_at: Some(now),
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn otp_send_state(&self) -> OtpSendState {
        OtpSendState {
            last_sent_at: self.otp_last_sent_at,
            window_started_at: self.otp_window_started_at,
            sends_in_window: self.otp_sends_in_window,
        }
    }

    pub fn apply_otp_send_state(&mut self, state: &OtpSendState) {
        self.otp_last_sent_at = state.last_sent_at;
        self.otp_window_started_at = state.window_started_at;
        self.otp_sends_in_window = state.sends_in_window;
    }

    pub fn apply_profile(&mut self, changes: RiderProfileChanges) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = changes.$field { self.$field = value; })*
            };
        }
        macro_rules! merge_opt {
            ($($field:ident),*) => {
                $(if changes.$field.is_some() { self.$field = changes.$field; })*
            };
        }
        merge!(first_name, last_name);
        merge_opt!(
            vehicle_type,
            number_plate,
            vehicle_make,
            vehicle_model,
            vehicle_image,
            national_id_number,
            national_id_image,
            driving_license_number,
            driving_license_image,
            emergency_contact,
            emergency_phone
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rider() -> Rider {
        Rider::new(
            NewRider {
                phone: "+254712345678".into(),
                email: "otieno@example.com".into(),
                first_name: "Otieno".into(),
                last_name: "Ouma".into(),
                password_hash: "hash".into(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_profile_merge_keeps_untouched_fields() {
        let mut rider = rider();
        rider.number_plate = Some("KDA 123A".into());

        rider.apply_profile(RiderProfileChanges {
            vehicle_type: Some("motorbike".into()),
            first_name: Some("Brian".into()),
            ..Default::default()
        });

        assert_eq!(rider.first_name, "Brian");
        assert_eq!(rider.last_name, "Ouma");
        assert_eq!(rider.vehicle_type.as_deref(), Some("motorbike"));
        assert_eq!(rider.number_plate.as_deref(), Some("KDA 123A"));
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let value = serde_json::to_value(rider()).unwrap();
        assert!(value.get("password_hash").is_none());
        assert!(value.get("otp_sends_in_window").is_none());
        assert_eq!(value["is_verified"], false);
    }
}
