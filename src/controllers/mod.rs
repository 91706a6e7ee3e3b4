pub mod client_controller;
pub mod message_controller;
pub mod payment_controller;
pub mod rider_controller;
pub mod trip_controller;
pub mod wallet_controller;
