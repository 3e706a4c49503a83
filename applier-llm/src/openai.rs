use crate::traits::{LlmClient, LlmError, LlmResponse, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant.";

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: usize,
}

#[derive(Serialize)]
pub struct ResponsesApiRequest {
    model: String,
    input: String,
    instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsesApiResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub output: Vec<ResponseMessage>,
    pub usage: Option<ResponseUsage>,
}

/// One element in the `output` array
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ResponseContent>,
}

/// One part of the message `content`
#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseUsage {
    pub total_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Create a new client for the given API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(LlmError::Config("OpenAI API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: OPENAI_API_BASE.to_string(),
            api_key,
            model,
            max_retries: 2,
        })
    }

    /// Point the client at an OpenAI-compatible gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    async fn post_responses(&self, req: &ResponsesApiRequest) -> Result<ResponsesApiResponse> {
        let url = format!("{}/responses", self.base_url);
        let mut attempt = 0usize;

        loop {
            let outcome = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(req)
                .send()
                .await;

            let retryable = match outcome {
                Ok(resp) if resp.status().is_success() => return Ok(resp.json().await?),
                Ok(resp) => {
                    let status = resp.status();
                    let message = resp.text().await.unwrap_or_default();
                    let err = if status == StatusCode::TOO_MANY_REQUESTS {
                        LlmError::RateLimit
                    } else {
                        LlmError::Api {
                            status: status.as_u16(),
                            message: snippet(&message),
                        }
                    };
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        err
                    } else {
                        return Err(err);
                    }
                }
                Err(e) => LlmError::Network(e),
            };

            if attempt >= self.max_retries {
                tracing::warn!(attempt, error = %retryable, "openai.request.failed");
                return Err(retryable);
            }
            attempt += 1;
            let delay = Duration::from_millis(200u64.saturating_mul(1 << (attempt - 1)));
            tracing::warn!(
                attempt,
                max_retries = self.max_retries,
                backoff_ms = delay.as_millis() as u64,
                error = %retryable,
                "openai.request.retrying"
            );
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "openai.generate");

        let req = ResponsesApiRequest {
            model: self.model.clone(),
            input: prompt.to_string(),
            instructions: system_prompt.unwrap_or(DEFAULT_INSTRUCTIONS).to_string(),
            max_output_tokens: max_tokens,
            temperature,
        };

        let resp = self.post_responses(&req).await?;
        tracing::debug!(id = %resp.id, status = %resp.status, "openai.response");

        let text = resp
            .output
            .iter()
            .filter(|msg| msg.kind == "message")
            .flat_map(|msg| &msg.content)
            .find(|c| c.kind == "output_text")
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::Empty);
        }

        Ok(LlmResponse {
            text,
            model: Some(resp.model),
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn snippet(body: &str) -> String {
    const MAX: usize = 512;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_api_key() {
        assert!(matches!(
            OpenAiClient::new("  ".into(), "gpt-4o-mini".into()),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = OpenAiClient::new("sk-test".into(), "gpt-4o-mini".into())
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/v1/");
        assert_eq!(client.base_url, "http://127.0.0.1:9999/v1");
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(600);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), 513);
        assert_eq!(snippet("short"), "short");
    }
}
