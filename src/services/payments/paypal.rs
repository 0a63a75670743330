use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use serde_json::json;

use super::{CaptureResult, CreatedOrder, PaymentProvider};

pub struct PayPalProvider {
    client_id: String,
    client_secret: String,
    // sandbox or live API base, e.g. https://api-m.sandbox.paypal.com
    api_url: String,
    brand_name: String,
    return_url: String,
    cancel_url: String,
    client: reqwest::Client,
}

impl PayPalProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        api_url: String,
        brand_name: String,
        return_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            api_url,
            brand_name,
            return_url,
            cancel_url,
            client: reqwest::Client::new(),
        }
    }

    async fn access_token(&self) -> anyhow::Result<String> {
        let auth = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret));

        let resp = self
            .client
            .post(format!("{}/v1/oauth2/token", self.api_url))
            .header("Authorization", format!("Basic {auth}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .context("failed to call PayPal token endpoint")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse PayPal token response")?;

        if !status.is_success() {
            anyhow::bail!("PayPal auth error ({}): {}", status, data);
        }

        data["access_token"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing access_token in PayPal response"))
    }
}

#[async_trait]
impl PaymentProvider for PayPalProvider {
    async fn create_order(
        &self,
        amount: f64,
        currency: &str,
        booking_id: &str,
        description: &str,
    ) -> anyhow::Result<CreatedOrder> {
        let token = self.access_token().await?;

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": booking_id,
                "description": description,
                "amount": {
                    "currency_code": currency,
                    "value": format!("{amount:.2}"),
                },
            }],
            "application_context": {
                "brand_name": self.brand_name,
                "landing_page": "NO_PREFERENCE",
                "user_action": "PAY_NOW",
                "return_url": self.return_url,
                "cancel_url": self.cancel_url,
            },
        });

        let resp = self
            .client
            .post(format!("{}/v2/checkout/orders", self.api_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .context("failed to create PayPal order")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse PayPal order response")?;

        if !status.is_success() {
            anyhow::bail!("PayPal order error ({}): {}", status, data);
        }

        let order_id = data["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing id in PayPal order response"))?;

        let approval_url = data["links"]
            .as_array()
            .and_then(|links| {
                links
                    .iter()
                    .find(|l| l["rel"].as_str() == Some("approve"))
            })
            .and_then(|l| l["href"].as_str())
            .map(|s| s.to_string());

        tracing::info!(order_id = %order_id, booking_id = %booking_id, "PayPal order created");

        Ok(CreatedOrder {
            order_id,
            approval_url,
        })
    }

    async fn capture_order(&self, order_id: &str) -> anyhow::Result<CaptureResult> {
        let token = self.access_token().await?;

        let resp = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{order_id}/capture",
                self.api_url
            ))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .context("failed to capture PayPal order")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse PayPal capture response")?;

        if !status.is_success() {
            anyhow::bail!("PayPal capture error ({}): {}", status, data);
        }

        let capture_status = data["status"].as_str().unwrap_or("UNKNOWN").to_string();
        let capture_id = data["purchase_units"][0]["payments"]["captures"][0]["id"]
            .as_str()
            .map(|s| s.to_string());

        tracing::info!(order_id = %order_id, status = %capture_status, "PayPal order captured");

        Ok(CaptureResult {
            status: capture_status,
            capture_id,
        })
    }
}
