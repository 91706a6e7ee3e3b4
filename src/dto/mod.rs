//! DTOs de la API
//!
//! Cuerpos de petición validados con `validator` y formas de respuesta.

pub mod client_dto;
pub mod common;
pub mod message_dto;
pub mod payment_dto;
pub mod rider_dto;
pub mod trip_dto;
pub mod wallet_dto;

pub use common::{ApiResponse, AuthResponse};
