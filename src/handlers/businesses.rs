use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Business, Service, Staff};
use crate::state::AppState;

// GET /api/businesses
#[derive(Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Business>>, AppError> {
    let db = state.db.lock().unwrap();
    let businesses = queries::list_businesses(&db, query.search.as_deref())?;
    Ok(Json(businesses))
}

// GET /api/businesses/:id
#[derive(Serialize)]
pub struct BusinessDetail {
    #[serde(flatten)]
    pub business: Business,
    pub services: Vec<Service>,
    pub staff: Vec<Staff>,
}

pub async fn get_business(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BusinessDetail>, AppError> {
    let db = state.db.lock().unwrap();

    let business = queries::get_business(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("business: {id}")))?;
    let services = queries::get_services(&db, &id)?;
    let staff = queries::get_staff(&db, &id)?;

    Ok(Json(BusinessDetail {
        business,
        services,
        staff,
    }))
}
