use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::TimeSlot;
use crate::services::availability::{
    compute_slots, local_now, AvailabilityRequest, BookedInterval,
};
use crate::state::AppState;

// GET /api/businesses/:id/availability?date=2025-06-16&duration=45&staff_id=...
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub duration: i64,
    // "auto" or absent means no preference
    pub staff_id: Option<String>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {}", query.date)))?;
    if query.duration <= 0 {
        return Err(AppError::Validation("duration must be positive".to_string()));
    }

    let staff_id = query
        .staff_id
        .as_deref()
        .filter(|s| !s.is_empty() && *s != "auto");

    let db = state.db.lock().unwrap();

    if queries::get_business(&db, &business_id)?.is_none() {
        return Err(AppError::NotFound(format!("business: {business_id}")));
    }

    // A failed fetch means "we don't know", which must not be presented as
    // "no slots today" — those are different answers.
    let opening_hours = queries::get_opening_hours(&db, &business_id).map_err(|e| {
        tracing::error!(error = %e, business_id = %business_id, "failed to load opening hours");
        AppError::AvailabilityUnavailable
    })?;

    let staff_week = match staff_id {
        Some(id) => Some(queries::get_staff_availability(&db, id).map_err(|e| {
            tracing::error!(error = %e, staff_id = %id, "failed to load staff availability");
            AppError::AvailabilityUnavailable
        })?),
        None => None,
    };

    let bookings = queries::get_blocking_bookings(&db, &business_id, date, staff_id)
        .map_err(|e| {
            tracing::error!(error = %e, business_id = %business_id, "failed to load bookings");
            AppError::AvailabilityUnavailable
        })?;
    let existing: Vec<BookedInterval> = bookings
        .iter()
        .map(|b| BookedInterval {
            start: b.start_time,
            end: b.end_time,
        })
        .collect();

    let slots = compute_slots(&AvailabilityRequest {
        date,
        duration_minutes: query.duration,
        opening_hours: opening_hours.as_ref(),
        staff_week: staff_week.as_deref(),
        staff_selected: staff_id.is_some(),
        existing: &existing,
        now: local_now(state.config.utc_offset_minutes),
    })
    .map_err(|e| {
        tracing::error!(error = %e, business_id = %business_id, "availability computation failed");
        AppError::AvailabilityUnavailable
    })?;

    Ok(Json(slots))
}
