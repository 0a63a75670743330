use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_api_url: String,
    pub currency: String,
    // minutes east of UTC for the local business day (SAST = 120)
    pub utc_offset_minutes: i32,
    pub brand_name: String,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "clipr.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            paypal_client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            paypal_client_secret: env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default(),
            paypal_api_url: env::var("PAYPAL_API_URL")
                .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "ZAR".to_string()),
            utc_offset_minutes: env::var("UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            brand_name: env::var("BRAND_NAME").unwrap_or_else(|_| "Clipr".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        }
    }
}
