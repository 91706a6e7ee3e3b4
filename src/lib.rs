//! RiderGo backend
//!
//! API de viajes y entregas en moto: motor de viajes, tarifas, monedero,
//! chat por viaje, verificación OTP y pagos M-Pesa.

pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::build_router;
pub use state::AppState;
