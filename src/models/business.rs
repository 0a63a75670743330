use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    // raw JSON as stored, parsed on demand via OpeningHours::from_json
    pub opening_hours: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub active: bool,
}
