//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio y las filas que mapean al
//! schema PostgreSQL.

pub mod client;
pub mod message;
pub mod otp;
pub mod payment;
pub mod rider;
pub mod trip;
pub mod wallet;

pub use client::Client;
pub use message::Message;
pub use otp::{OtpRecord, OtpSendState};
pub use payment::{PaymentIntent, PaymentPurpose, PaymentStatus, Settlement, SettlementOutcome, SettlementTarget};
pub use rider::Rider;
pub use trip::{GeoPoint, LiveLocation, Place, ServiceType, Trip, TripDetails, TripStatus};
pub use wallet::{Direction, Wallet, WalletTransaction};
