pub mod availability;
pub mod booking;
pub mod business;

pub use availability::{
    default_staff_week, DayHours, OpeningHours, StaffDayAvailability, TimeSlot,
};
pub use booking::{Booking, BookingService, BookingStatus};
pub use business::{Business, Service, Staff};
