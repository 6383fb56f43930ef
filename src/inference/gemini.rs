//! Gemini `generateContent` client in JSON mode.

use std::fmt;
use std::time::Instant;

use reqwest::{Client, Url};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{fail_closed_payload, prompt, Analyzer};
use crate::config::GuardConfig;
use crate::error::Error;

/// Error bodies are cut to this many characters.
const MAX_ERROR_BODY: usize = 320;

/// Header carrying the API key; keeps the credential out of URLs and error text.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    url: Url,
    model: String,
    api_key: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from validated configuration.
    pub fn new(config: &GuardConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;
        let url = resolve_endpoint(&config.endpoint, &config.model)?;

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Model name requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one review request and return the model's text.
    pub async fn try_analyze(&self, diff: &str, context: &str) -> Result<String, Error> {
        let payload = json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt::compose(diff, context) }
                    ]
                }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": prompt::response_schema()
            }
        });

        let started = Instant::now();
        let response = self
            .client
            .post(self.url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                Error::inference(format!("gemini request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::inference(format!(
                "gemini error {}: {}",
                status,
                truncate(&body, MAX_ERROR_BODY)
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| {
                Error::inference(format!("invalid gemini response: {}", e.without_url()))
            })?;

        debug!(
            model = %self.model,
            latency_ms = started.elapsed().as_millis() as u64,
            "Gemini responded"
        );

        let text = extract_text(&body);
        if text.trim().is_empty() {
            let reason = body["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| body["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("no candidates");
            return Err(Error::inference(format!(
                "gemini returned no text ({})",
                reason
            )));
        }

        Ok(text)
    }
}

impl Analyzer for GeminiClient {
    async fn analyze(&self, diff: &str, context: &str) -> String {
        info!(model = %self.model, "Analyzing staged changes");
        match self.try_analyze(diff, context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Inference failed, blocking commit");
                fail_closed_payload(&e)
            }
        }
    }
}

/// Build the `generateContent` URL. The API key travels in a header.
fn resolve_endpoint(endpoint: &str, model: &str) -> Result<Url, Error> {
    let url = if endpoint.contains(":generateContent") {
        Url::parse(endpoint)
            .map_err(|e| Error::config(format!("invalid gemini endpoint {}: {}", endpoint, e)))?
    } else {
        let model = model.trim_start_matches("models/");
        let generated = format!(
            "{}/v1beta/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            model
        );
        Url::parse(&generated)
            .map_err(|e| Error::config(format!("invalid gemini endpoint {}: {}", generated, e)))?
    };

    Ok(url)
}

/// Join the text parts of the first candidate.
fn extract_text(body: &Value) -> String {
    body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
