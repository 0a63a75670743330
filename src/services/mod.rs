pub mod availability;
pub mod booking;
pub mod payments;
pub mod support;
