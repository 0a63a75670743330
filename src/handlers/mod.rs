pub mod admin;
pub mod availability;
pub mod bookings;
pub mod businesses;
pub mod chat;
pub mod health;
pub mod owner;
pub mod payments;
