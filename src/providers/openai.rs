use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, error, warn};
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::app_config::{CommonConfig, ProviderConfig};
use crate::errors::ProviderError;
use crate::providers::{ChatPrompt, Provider};

/// Client for OpenAI-compatible chat-completions endpoints
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for bearer authentication
    api_key: String,
    /// Base URL, without the `/chat/completions` suffix
    endpoint: String,
    /// Model name sent with every request
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    rate_limit: Option<u32>,
    /// Bound on each request, also set per request in case the client fell back to defaults
    timeout: Duration,
    /// Start of the previous request, for client-side rate limiting
    last_request: Mutex<Option<Instant>>,
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    /// Model to use
    model: String,
    /// Conversation messages
    messages: Vec<RequestMessage>,
    /// Sampling temperature
    temperature: f32,
}

/// One request message
#[derive(Debug, Serialize)]
pub struct RequestMessage {
    role: String,
    content: MessageContent,
}

/// Plain text or a list of typed parts (multimodal)
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A typed part of multimodal message content
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    url: String,
}

/// Chat-completions response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated choices; the first one is used
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize, Default)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl OpenAI {
    /// Create a client with default retry settings
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new_with_config(
            &ProviderConfig {
                api_key: api_key.into(),
                endpoint: endpoint.into(),
                model: model.into(),
                ..ProviderConfig::default()
            },
            &CommonConfig::default(),
        )
    }

    /// Create a client from configuration
    pub fn new_with_config(provider: &ProviderConfig, common: &CommonConfig) -> Self {
        let timeout = Duration::from_secs(provider.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|e| {
                warn!("Could not configure HTTP client ({}), using defaults with per-request timeouts", e);
                Client::new()
            });

        Self {
            client,
            api_key: provider.api_key.clone(),
            endpoint: provider.endpoint.trim_end_matches('/').to_string(),
            model: provider.model.clone(),
            temperature: common.temperature,
            max_retries: common.retry_count,
            backoff_base_ms: common.retry_backoff_ms,
            rate_limit: provider.rate_limit.filter(|rpm| *rpm > 0),
            timeout,
            last_request: Mutex::new(None),
        }
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    fn build_request(&self, prompt: &ChatPrompt) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(RequestMessage {
                role: "system".to_string(),
                content: MessageContent::Text(system.clone()),
            });
        }

        let content = match &prompt.image {
            Some(image) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.user.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.to_data_uri(),
                    },
                },
            ]),
            None => MessageContent::Text(prompt.user.clone()),
        };
        messages.push(RequestMessage {
            role: "user".to_string(),
            content,
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        }
    }

    /// Space request starts according to the configured requests-per-minute
    async fn wait_for_rate_limit(&self) {
        let Some(rate_limit) = self.rate_limit else {
            return;
        };
        let interval = Duration::from_millis(60_000 / rate_limit as u64);

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Exponential backoff with up to 25% random jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
        let jitter = rand::rng().random_range(0..=base / 4);
        Duration::from_millis(base + jitter)
    }

    async fn send_once(&self, url: &str, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::ConnectionError(format!("request timed out: {}", e))
                } else {
                    ProviderError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read response body: {}", e)))?;

        if status.is_success() {
            return serde_json::from_str::<ChatCompletionResponse>(&body).map_err(|e| {
                let preview: String = body.chars().take(500).collect();
                ProviderError::ParseError(format!("{} (body: {})", e, preview))
            });
        }

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(body),
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            },
        })
    }
}

impl fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAI")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for OpenAI {
    type Response = ChatCompletionResponse;

    /// Send the prompt, retrying transient failures.
    ///
    /// Network errors, 429 and 5xx responses are retried with exponential
    /// backoff; other client errors fail immediately.
    async fn complete(&self, prompt: ChatPrompt) -> Result<Self::Response, ProviderError> {
        let url = self.completions_url();
        let request = self.build_request(&prompt);

        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            self.wait_for_rate_limit().await;

            match self.send_once(&url, &request).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            "Completion used {} prompt / {} completion tokens",
                            usage.prompt_tokens, usage.completion_tokens
                        );
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() => {
                    warn!("Model API error: {} - attempt {}/{}", e, attempt + 1, self.max_retries + 1);
                    last_error = Some(e);
                }
                Err(e) => {
                    error!("Model API error: {}", e);
                    return Err(e);
                }
            }

            attempt += 1;

            if attempt <= self.max_retries {
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed(format!("request failed after {} attempts", self.max_retries + 1))
        }))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self.complete(ChatPrompt::text("Reply with OK.", "Hello")).await?;
        if Self::extract_text(&response).trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(())
    }

    fn extract_text(response: &Self::Response) -> String {
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}
