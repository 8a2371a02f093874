//! OpenAI-compatible chat-completions provider.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::LlmProvider;
use crate::error::{RagError, Result};

pub struct ExternalProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: usize,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ExternalProvider {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        max_tokens: usize,
        timeout_secs: u64,
    ) -> Result<Self> {
        // A hung endpoint must take the same branch as any other provider
        // error, so the timeout lives in the client itself.
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for ExternalProvider {
    async fn generate(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RagError::Generation(format!("request to {} timed out", endpoint))
                } else {
                    RagError::Generation(format!("request to {} failed: {}", endpoint, e))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RagError::Generation(format!("failed to read response body: {}", e)))?;

        // Known quota-exhaustion shapes map to the dedicated offline branch.
        if status.as_u16() == 429 || text.contains("insufficient_quota") {
            return Err(RagError::QuotaExhausted);
        }
        if !status.is_success() {
            let preview: String = text.chars().take(200).collect();
            return Err(RagError::Generation(format!(
                "{} returned HTTP {}: {}",
                endpoint, status, preview
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            RagError::Generation(format!("unparseable response ({}): {}", e, preview))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| RagError::Generation("no content in response".to_string()))
    }
}
