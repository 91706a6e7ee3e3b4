//! Modelo de Client
//!
//! Cuenta del lado que solicita viajes. Se identifica solo por teléfono.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::otp::OtpSendState;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub home_address: Option<String>,
    pub work_address: Option<String>,
    pub profile_photo: Option<String>,
    #[serde(skip_serializing)]
    pub otp_last_sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_window_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_sends_in_window: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub home_address: Option<String>,
    pub work_address: Option<String>,
    pub profile_photo: Option<String>,
}

impl Client {
    pub fn new(phone: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone,
            name: None,
            email: None,
            home_address: None,
            work_address: None,
            profile_photo: None,
            otp_last_sent_at: None,
            otp_window_started_at: None,
            otp_sends_in_window: 0,
            created_at: now,
            updated_at: now,
        }
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

    pub fn apply_profile(&mut self, changes: ClientProfileChanges) {
        if changes.name.is_some() {
            self.name = changes.name;
        }
        if changes.email.is_some() {
            self.email = changes.email;
        }
        if changes.home_address.is_some() {
            self.home_address = changes.home_address;
        }
        if changes.work_address.is_some() {
            self.work_address = changes.work_address;
        }
        if changes.profile_photo.is_some() {
            self.profile_photo = changes.profile_photo;
        }
    }
}
