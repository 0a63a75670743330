use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::booking::transition_booking;
use crate::state::AppState;

// Share of the booking total taken up front to secure the slot.
const DEPOSIT_RATE: f64 = 0.5;

// POST /api/payments/orders
#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub booking_id: String,
}

#[derive(Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub approval_url: Option<String>,
    pub amount: f64,
    pub currency: String,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_id(&db, &body.booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking: {}", body.booking_id)))?
    };

    if booking.status != BookingStatus::Pending {
        return Err(AppError::Validation(format!(
            "booking is {}, deposit can only be taken while pending",
            booking.status.as_str()
        )));
    }

    let amount = booking.total_amount * DEPOSIT_RATE;
    let currency = state.config.currency.clone();

    let order = state
        .payments
        .create_order(amount, &currency, &booking.id, "Booking deposit")
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    {
        let db = state.db.lock().unwrap();
        queries::insert_payment_order(&db, &order.order_id, &booking.id, amount, &currency)?;
    }

    Ok(Json(CreateOrderResponse {
        order_id: order.order_id,
        approval_url: order.approval_url,
        amount,
        currency,
    }))
}

// POST /api/payments/orders/:order_id/capture
#[derive(Serialize)]
pub struct CaptureResponse {
    pub status: String,
    pub capture_id: Option<String>,
    pub booking_id: String,
}

pub async fn capture_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<CaptureResponse>, AppError> {
    let booking_id = {
        let db = state.db.lock().unwrap();
        queries::get_payment_order_booking(&db, &order_id)?
            .ok_or_else(|| AppError::NotFound(format!("payment order: {order_id}")))?
    };

    let result = state
        .payments
        .capture_order(&order_id)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    if result.is_completed() {
        let db = state.db.lock().unwrap();
        queries::mark_payment_order_captured(&db, &order_id)?;

        // The deposit confirms the booking; a booking already moved out of
        // pending (e.g. cancelled meanwhile) is left alone.
        let booking = queries::get_booking_by_id(&db, &booking_id)?;
        if booking.map(|b| b.status) == Some(BookingStatus::Pending) {
            transition_booking(&db, &booking_id, BookingStatus::Confirmed, None)?;
        }
    }

    Ok(Json(CaptureResponse {
        status: result.status,
        capture_id: result.capture_id,
        booking_id,
    }))
}
