use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::admin::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::availability::parse_time;
use crate::models::{Business, OpeningHours, Service, Staff, StaffDayAvailability};
use crate::state::AppState;

// Lowercased name with runs of non-alphanumerics collapsed to single dashes,
// plus a random suffix so two "Fade Factory" listings don't collide.
fn generate_slug(name: &str) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let base = base
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let suffix = Uuid::new_v4().to_string();
    format!("{base}-{}", &suffix[..8])
}

fn validate_hours(hours: &serde_json::Value) -> Result<String, AppError> {
    let raw = hours.to_string();
    OpeningHours::from_json(&raw)
        .map_err(|e| AppError::Validation(format!("invalid opening hours: {e}")))?;
    Ok(raw)
}

// POST /api/businesses
#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub opening_hours: Option<serde_json::Value>,
}

pub async fn create_business(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<Business>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.name.trim().is_empty() {
        return Err(AppError::Validation("business name is required".to_string()));
    }
    let opening_hours = body.opening_hours.as_ref().map(validate_hours).transpose()?;

    let business = Business {
        id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        slug: generate_slug(&body.name),
        description: body.description,
        address: body.address,
        phone: body.phone,
        opening_hours,
    };

    {
        let db = state.db.lock().unwrap();
        queries::insert_business(&db, &business)?;
    }
    tracing::info!(business_id = %business.id, name = %business.name, "business registered");

    Ok((StatusCode::CREATED, Json(business)))
}

// PUT /api/businesses/:id/hours — body is the opening-hours object itself.
pub async fn update_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Business>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let raw = validate_hours(&body)?;

    let db = state.db.lock().unwrap();
    if !queries::update_opening_hours(&db, &id, &raw)? {
        return Err(AppError::NotFound(format!("business: {id}")));
    }
    let business = queries::get_business(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("business: {id}")))?;
    Ok(Json(business))
}

// POST /api/businesses/:id/services
#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub price: f64,
    pub duration_minutes: i32,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(business_id): Path<String>,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.name.trim().is_empty() {
        return Err(AppError::Validation("service name is required".to_string()));
    }
    if body.price < 0.0 {
        return Err(AppError::Validation("price cannot be negative".to_string()));
    }
    if body.duration_minutes <= 0 {
        return Err(AppError::Validation("duration must be positive".to_string()));
    }

    let db = state.db.lock().unwrap();
    if queries::get_business(&db, &business_id)?.is_none() {
        return Err(AppError::NotFound(format!("business: {business_id}")));
    }

    let service = Service {
        id: Uuid::new_v4().to_string(),
        business_id,
        name: body.name.trim().to_string(),
        price: body.price,
        duration_minutes: body.duration_minutes,
        active: true,
    };
    queries::insert_service(&db, &service)?;

    Ok((StatusCode::CREATED, Json(service)))
}

// POST /api/businesses/:id/staff
#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
}

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(business_id): Path<String>,
    Json(body): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<Staff>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.name.trim().is_empty() {
        return Err(AppError::Validation("staff name is required".to_string()));
    }

    let db = state.db.lock().unwrap();
    if queries::get_business(&db, &business_id)?.is_none() {
        return Err(AppError::NotFound(format!("business: {business_id}")));
    }

    // No availability rows are written here; the default week applies until
    // the owner configures one.
    let staff = Staff {
        id: Uuid::new_v4().to_string(),
        business_id,
        name: body.name.trim().to_string(),
        active: true,
    };
    queries::insert_staff(&db, &staff)?;

    Ok((StatusCode::CREATED, Json(staff)))
}

// PUT /api/staff/:id/availability — upserts the given weekday rows, leaving
// unmentioned days as they are.
pub async fn set_staff_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(staff_id): Path<String>,
    Json(days): Json<Vec<StaffDayAvailability>>,
) -> Result<Json<Vec<StaffDayAvailability>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    for day in &days {
        if day.day_of_week > 6 {
            return Err(AppError::Validation(format!(
                "day_of_week must be 0-6, got {}",
                day.day_of_week
            )));
        }
        let start = parse_time(&day.start_time)
            .map_err(|_| AppError::Validation(format!("invalid start_time: {}", day.start_time)))?;
        let end = parse_time(&day.end_time)
            .map_err(|_| AppError::Validation(format!("invalid end_time: {}", day.end_time)))?;
        if day.is_available && end <= start {
            return Err(AppError::Validation(format!(
                "end_time must be after start_time on day {}",
                day.day_of_week
            )));
        }
    }

    let db = state.db.lock().unwrap();
    if queries::get_staff_member(&db, &staff_id)?.is_none() {
        return Err(AppError::NotFound(format!("staff: {staff_id}")));
    }
    for day in &days {
        queries::set_staff_availability(&db, &staff_id, day)?;
    }

    let week = queries::get_staff_availability(&db, &staff_id)?;
    Ok(Json(week))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_slug_normalizes_name() {
        let slug = generate_slug("  Fade & Factory!  ");
        assert!(slug.starts_with("fade-factory-"));
        assert!(!slug.contains("--"));
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn test_generate_slug_is_unique_per_call() {
        assert_ne!(generate_slug("Fade Factory"), generate_slug("Fade Factory"));
    }
}
