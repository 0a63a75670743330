use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::booking::transition_booking;
use crate::state::AppState;

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct StatsResponse {
    business_count: i64,
    bookings_today: i64,
    pending_count: i64,
    upcoming_confirmed: i64,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let stats = {
        let db = state.db.lock().unwrap();
        queries::get_dashboard_stats(&db)?
    };

    Ok(Json(StatsResponse {
        business_count: stats.business_count,
        bookings_today: stats.bookings_today,
        pending_count: stats.pending_count,
        upcoming_confirmed: stats.upcoming_confirmed,
    }))
}

// GET /api/admin/bookings?business_id=...&status=...&limit=50
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub business_id: String,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50);
    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_business(
            &db,
            &query.business_id,
            query.status.as_deref(),
            limit,
        )?
    };

    Ok(Json(bookings))
}

// POST /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub reason: Option<String>,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let next = BookingStatus::parse(&body.status);
    if next.as_str() != body.status {
        return Err(AppError::Validation(format!(
            "unknown status: {}",
            body.status
        )));
    }

    let booking = {
        let db = state.db.lock().unwrap();
        transition_booking(&db, &id, next, body.reason.as_deref())?
    };

    Ok(Json(booking))
}
