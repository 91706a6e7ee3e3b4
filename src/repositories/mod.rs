//! Repositorios
//!
//! Cada agregado expone un trait asíncrono con una implementación PostgreSQL
//! y la implementación en memoria de `memory::MemoryStore`.

pub mod client_repository;
pub mod memory;
pub mod message_repository;
pub mod otp_repository;
pub mod payment_repository;
pub mod rider_repository;
pub mod trip_repository;
pub mod wallet_repository;

pub use client_repository::{ClientRepository, PgClientRepository};
pub use memory::MemoryStore;
pub use message_repository::{MessageRepository, PgMessageRepository};
pub use otp_repository::OtpRepository;
pub use payment_repository::{PaymentRepository, PgPaymentRepository};
pub use rider_repository::{PgRiderRepository, RiderRepository};
pub use trip_repository::{PgTripRepository, TripActor, TripRepository};
pub use wallet_repository::{PgWalletRepository, WalletRepository};
