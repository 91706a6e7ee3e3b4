//! Services module
//!
//! Este módulo contiene la lógica de negocio sin estado HTTP: tarifas,
//! control de suscripción, política OTP y las integraciones externas
//! (M-Pesa, WhatsApp).

pub mod messaging_service;
pub mod mpesa_service;
pub mod otp_service;
pub mod pricing_service;
pub mod subscription_service;

pub use messaging_service::{LogOtpSender, OtpSender, WhatsAppOtpSender};
pub use mpesa_service::{MpesaClient, PaymentGateway};
pub use otp_service::OtpService;
