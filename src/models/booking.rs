use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub business_id: String,
    pub staff_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub customer_notes: Option<String>,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// Denormalized at booking time so later catalogue edits don't rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingService {
    pub service_name: String,
    pub service_price: f64,
    pub service_duration: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "completed" => BookingStatus::Completed,
            "cancelled" => BookingStatus::Cancelled,
            "no_show" => BookingStatus::NoShow,
            _ => BookingStatus::Pending,
        }
    }

    // Only pending and confirmed bookings occupy a slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (*self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }
}
