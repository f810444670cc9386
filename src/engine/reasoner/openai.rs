// Engram Belief — OpenAI-Compatible Reasoner
// Handles: OpenAI, OpenRouter, Ollama, and any OpenAI-compatible chat API.
// Implements the Reasoner trait with one non-streaming chat completion.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Reasoner, ReasonerRequest};
use crate::engine::belief::prompt::truncate_chars;
use crate::engine::config::ReasonerConfig;
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const PROVIDER: &str = "openai";

pub struct OpenAiReasoner {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f64>,
}

impl OpenAiReasoner {
    pub fn new(config: &ReasonerConfig) -> EngineResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        Ok(OpenAiReasoner {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn request_body(&self, request: &ReasonerRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "stream": false,
        });
        if let Some(temp) = self.temperature {
            body["temperature"] = json!(temp);
        }
        body
    }
}

/// Pull `choices[0].message.content` out of a chat completion response.
fn extract_content(response: &Value) -> EngineResult<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EngineError::provider(PROVIDER, "response has no choices[0].message.content"))
}

#[async_trait]
impl Reasoner for OpenAiReasoner {
    async fn complete(&self, request: &ReasonerRequest) -> EngineResult<String> {
        info!("[belief:reasoner] Request to {} model={}", self.endpoint, self.model);

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = req.json(&self.request_body(request)).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body_text = response.text().await.unwrap_or_default();
            error!(
                "[belief:reasoner] API error {}: {}",
                status,
                truncate_chars(&body_text, 500)
            );
            return Err(EngineError::provider(
                PROVIDER,
                format!("API error {}: {}", status, truncate_chars(&body_text, 200)),
            ));
        }

        let payload: Value = response.json().await?;
        extract_content(&payload)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
