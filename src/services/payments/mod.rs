pub mod paypal;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
    pub approval_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    pub status: String,
    pub capture_id: Option<String>,
}

impl CaptureResult {
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_order(
        &self,
        amount: f64,
        currency: &str,
        booking_id: &str,
        description: &str,
    ) -> anyhow::Result<CreatedOrder>;

    async fn capture_order(&self, order_id: &str) -> anyhow::Result<CaptureResult>;
}
