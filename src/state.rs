use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::payments::PaymentProvider;
use crate::services::support::LlmProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
    pub payments: Box<dyn PaymentProvider>,
}
