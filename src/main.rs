use std::sync::{Arc, Mutex};

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use clipr::config::AppConfig;
use clipr::db;
use clipr::handlers;
use clipr::services::payments::paypal::PayPalProvider;
use clipr::services::support::GroqProvider;
use clipr::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    anyhow::ensure!(
        !config.groq_api_key.is_empty(),
        "GROQ_API_KEY must be set"
    );
    tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
    let llm = GroqProvider::new(config.groq_api_key.clone(), config.groq_model.clone());

    let payments = PayPalProvider::new(
        config.paypal_client_id.clone(),
        config.paypal_client_secret.clone(),
        config.paypal_api_url.clone(),
        config.brand_name.clone(),
        format!("{}/booking-success", config.frontend_url),
        format!("{}/booking-cancelled", config.frontend_url),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        llm: Box::new(llm),
        payments: Box::new(payments),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/businesses",
            get(handlers::businesses::list_businesses).post(handlers::owner::create_business),
        )
        .route("/api/businesses/:id", get(handlers::businesses::get_business))
        .route(
            "/api/businesses/:id/hours",
            put(handlers::owner::update_hours),
        )
        .route(
            "/api/businesses/:id/services",
            post(handlers::owner::create_service),
        )
        .route(
            "/api/businesses/:id/staff",
            post(handlers::owner::create_staff),
        )
        .route(
            "/api/staff/:id/availability",
            put(handlers::owner::set_staff_availability),
        )
        .route(
            "/api/businesses/:id/availability",
            get(handlers::availability::get_availability),
        )
        .route("/api/bookings", post(handlers::bookings::create))
        .route("/api/bookings/:id/cancel", post(handlers::bookings::cancel))
        .route("/api/payments/orders", post(handlers::payments::create_order))
        .route(
            "/api/payments/orders/:order_id/capture",
            post(handlers::payments::capture_order),
        )
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            post(handlers::admin::update_booking_status),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
