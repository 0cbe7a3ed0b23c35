// LLM classifier client
// Author: kelexine (https://github.com/kelexine)

use super::prompt::{build_prompt, parse_classification, system_prompt};
use super::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat};
use crate::config::ClassifierConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::utils::logging::redact;
use crate::utils::retry::{parse_retry_after, with_retry, RetryPolicy, UpstreamFailure};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// One call classifies one query against a taxonomy. The response cache
/// wraps [`classify`](Self::classify); this type knows nothing about caching.
#[derive(Clone)]
pub struct LlmClassifier {
    http_client: Client,
    config: ClassifierConfig,
    api_key: String,
    retry_policy: RetryPolicy,
}

impl LlmClassifier {
    /// Build a classifier with a pooled HTTP client.
    ///
    /// The API key comes from the config, falling back to `OPENAI_API_KEY`.
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let api_key = if config.api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            config.api_key.clone()
        };
        if api_key.is_empty() {
            return Err(AppError::Config(
                "classifier API key missing (set classifier.api_key or OPENAI_API_KEY)".into(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created classifier HTTP client for {}", config.api_base_url);

        Ok(Self {
            http_client,
            config: config.clone(),
            api_key,
            retry_policy: RetryPolicy {
                max_attempts: config.max_attempts,
                ..RetryPolicy::default()
            },
        })
    }

    /// Override the retry timing (tests use millisecond intervals).
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Classify `text` against `taxonomy`.
    ///
    /// Retries rate limits and server errors per the retry policy, then maps
    /// the final failure onto [`AppError`].
    pub async fn classify(&self, text: &str, taxonomy: &Value) -> Result<Value> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        );
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(text, taxonomy),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat::json_object(),
        };

        debug!("Calling classifier model {} ({} chars of query)", self.config.model, text.len());
        let started = Instant::now();

        let outcome = with_retry("Classification", &self.retry_policy, || {
            self.send_once(&url, &request)
        })
        .await;

        metrics::record_classifier_call(
            &self.config.model,
            outcome.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let content = outcome.map_err(|failure| {
            error!(
                "Classifier call failed with {}: {}",
                failure.status,
                redact(&failure.message)
            );
            match failure.status {
                429 => AppError::TooManyRequests(redact(&failure.message)),
                0 | 502..=504 => AppError::ServiceUnavailable(redact(&failure.message)),
                status => AppError::Classifier(format!(
                    "HTTP {}: {}",
                    status,
                    redact(&failure.message)
                )),
            }
        })?;

        parse_classification(&content)
    }

    async fn send_once(
        &self,
        url: &str,
        request: &ChatCompletionRequest,
    ) -> std::result::Result<String, UpstreamFailure> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamFailure::new(0, format!("HTTP error: {}", e)))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = extract_error_message(&body).unwrap_or(body);
            return Err(UpstreamFailure {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| UpstreamFailure::new(500, format!("Invalid response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| UpstreamFailure::new(500, "response contained no choices"))
    }
}

/// Extract error message from API response JSON
fn extract_error_message(response_text: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        #[serde(rename = "type")]
        error_type: Option<String>,
    }

    let error = serde_json::from_str::<ErrorResponse>(response_text)
        .ok()?
        .error?;
    error.message.or(error.error_type)
}

/// Load the default taxonomy context from a JSON file.
///
/// An empty path yields an empty object.
pub fn load_taxonomy(path: &str) -> Result<Value> {
    if path.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let raw = std::fs::read_to_string(Path::new(path))?;
    let taxonomy: Value = serde_json::from_str(&raw)?;
    info!("Loaded taxonomy from {}", path);
    Ok(taxonomy)
}
