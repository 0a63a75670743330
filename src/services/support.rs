use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// The help desk only sees the tail of long conversations.
const MAX_HISTORY_MESSAGES: usize = 20;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

// Help-desk tuning: answers should stay short and a little conversational.
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1024;

const SYSTEM_PROMPT: &str = "\
You are a helpful customer support assistant for Clipr, a barber and salon \
booking marketplace. You help customers with:

1. Booking questions: how to book, select services, choose a barber, pick dates and times.
2. Deposit rules: a 50% deposit secures any booking; bookings are not confirmed \
until the deposit is paid; unpaid slots remain available; deposits are deducted \
from the final service price.
3. Cancellation policy: free cancellation up to 24 hours before the appointment; \
cancellations within 24 hours forfeit 50% of the deposit; no-shows forfeit the \
entire deposit; rescheduling is free with 24+ hours notice.
4. Late arrivals: a 15-minute grace period applies (configurable by the business); \
arriving later may forfeit the deposit at the business's discretion.
5. Refunds: deposits are refundable only for cancellations made 24+ hours ahead; \
service issues must be reported within 24 hours; refunds are processed within \
5-7 business days.
6. Loyalty: points accrue on every completed booking; five bookings at the same \
business earn a free haircut voucher, valid for 90 days, one per visit.

Be friendly, concise, and helpful. If you don't know something specific, direct \
the customer to contact the business directly.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String>;
}

// One help-desk turn: the new message plus a bounded slice of history.
pub async fn help_desk_reply(
    llm: &dyn LlmProvider,
    history: &[Message],
    message: &str,
) -> anyhow::Result<String> {
    let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    let mut messages: Vec<Message> = history[start..].to_vec();
    messages.push(Message {
        role: "user".to_string(),
        content: message.to_string(),
    });

    llm.chat(SYSTEM_PROMPT, &messages).await
}

pub struct GroqProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Message,
}

fn with_system_prompt(system_prompt: &str, messages: &[Message]) -> Vec<Message> {
    let mut all = Vec::with_capacity(messages.len() + 1);
    all.push(Message {
        role: "system".to_string(),
        content: system_prompt.to_string(),
    });
    all.extend_from_slice(messages);
    all
}

impl GroqProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: with_system_prompt(system_prompt, messages),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let resp = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Groq API")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("Groq API error ({status}): {detail}");
        }

        let completion: ChatCompletionResponse = resp
            .json()
            .await
            .context("failed to parse Groq response")?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if reply.trim().is_empty() {
            anyhow::bail!("empty completion from Groq");
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingLlm {
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn chat(&self, _system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let llm = RecordingLlm {
            seen: Mutex::new(vec![]),
        };
        let history: Vec<Message> = (0..50)
            .map(|i| Message {
                role: "user".to_string(),
                content: format!("msg {i}"),
            })
            .collect();

        help_desk_reply(&llm, &history, "latest").await.unwrap();

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), MAX_HISTORY_MESSAGES + 1);
        assert_eq!(seen.last().unwrap().content, "latest");
        assert_eq!(seen.first().unwrap().content, "msg 30");
    }

    #[test]
    fn test_system_prompt_leads_the_conversation() {
        let history = vec![Message {
            role: "user".to_string(),
            content: "hi".to_string(),
        }];
        let all = with_system_prompt("rules", &history);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].role, "system");
        assert_eq!(all[0].content, "rules");
        assert_eq!(all[1].content, "hi");
    }

    #[test]
    fn test_completion_request_shape() {
        let body = ChatCompletionRequest {
            model: "test-model",
            messages: with_system_prompt("rules", &[]),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["role"], "system");
    }
}
