use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::availability::parse_time;
use crate::models::{Booking, BookingService, BookingStatus};
use crate::services::booking::{create_booking, transition_booking, NewBooking};
use crate::state::AppState;

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub business_id: String,
    // "auto" or absent means no preference
    pub staff_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub customer_notes: Option<String>,
    pub booking_date: String,
    pub start_time: String,
    pub services: Vec<ServiceLine>,
}

#[derive(Deserialize)]
pub struct ServiceLine {
    pub name: String,
    pub price: f64,
    pub duration_minutes: i32,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking_date = NaiveDate::parse_from_str(&body.booking_date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid booking_date: {}", body.booking_date)))?;
    let start_time = parse_time(&body.start_time)
        .map_err(|_| AppError::Validation(format!("invalid start_time: {}", body.start_time)))?;

    let staff_id = body
        .staff_id
        .filter(|s| !s.is_empty() && s != "auto");

    let services: Vec<BookingService> = body
        .services
        .into_iter()
        .map(|s| BookingService {
            service_name: s.name,
            service_price: s.price,
            service_duration: s.duration_minutes,
        })
        .collect();

    let booking = {
        let db = state.db.lock().unwrap();
        create_booking(
            &db,
            NewBooking {
                business_id: body.business_id,
                staff_id,
                customer_id: body.customer_id,
                customer_name: body.customer_name,
                customer_email: body.customer_email,
                customer_phone: body.customer_phone,
                customer_notes: body.customer_notes,
                booking_date,
                start_time,
                services,
            },
        )?
    };

    Ok((StatusCode::CREATED, Json(booking)))
}

// POST /api/bookings/:id/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db.lock().unwrap();
    let booking = transition_booking(&db, &id, BookingStatus::Cancelled, body.reason.as_deref())?;
    Ok(Json(booking))
}
