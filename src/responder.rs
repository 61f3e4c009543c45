//! Persona-conditioned text generation against an Ollama-style `/api/generate` endpoint.

use std::time::SystemTime;

use async_trait::async_trait;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Duration};

use crate::error::{EvalError, Result};

/// Recorded in place of an answer once every attempt has failed.
pub const FAILED_RESPONSE: &str = "Error occurred during LLM call";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

#[async_trait]
pub trait TextResponder: Send + Sync {
    /// One completion for `prompt`, with `persona` as the system prompt.
    async fn generate(&self, persona: &str, prompt: &str) -> Result<String>;
}

pub fn build_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;

    Ok(client)
}

#[derive(Debug, Clone)]
pub struct HttpResponder {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateReply {
    response: Option<String>,
}

impl HttpResponder {
    pub fn new(url: &str, model: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            url: url.to_owned(),
            model: model.to_owned(),
        })
    }
}

#[async_trait]
impl TextResponder for HttpResponder {
    async fn generate(&self, persona: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model":  self.model,
            "prompt": prompt,
            "system": persona,
            "stream": false,
        });

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let resp = resp.error_for_status()?;
        let reply: GenerateReply = resp.json().await?;
        reply
            .response
            .map(|text| text.trim().to_owned())
            .ok_or_else(|| EvalError::Responder("reply has no `response` field".into()))
    }
}

fn backoff_ms(attempt: u32) -> u64 {
    let jitter = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_millis() as u64)
        .unwrap_or(0);
    500u64 * 2u64.pow(attempt) + jitter % 300
}

/// Asks up to `max_attempts` times, backing off between failures.
/// Never fails: after the last attempt the answer is [`FAILED_RESPONSE`].
pub async fn elicit<R: TextResponder + ?Sized>(responder: &R, persona: &str, prompt: &str, max_attempts: u32) -> String {
    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match responder.generate(persona, prompt).await {
            Ok(text) => return text,
            Err(e) if attempt < max_attempts => {
                warn!("attempt {attempt}/{max_attempts} failed: {e}");
                sleep(Duration::from_millis(backoff_ms(attempt))).await;
            }
            Err(e) => warn!("giving up after {max_attempts} attempts: {e}"),
        }
    }
    FAILED_RESPONSE.to_owned()
}
