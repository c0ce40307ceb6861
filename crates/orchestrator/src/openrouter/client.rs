use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::types::*;
use crate::agent::AgentError;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Backoff settings for rate limits and server errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 60000,
        }
    }
}

#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenRouterClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn with_retry<T, F, Fut>(&self, operation: F, operation_name: &str) -> Result<T, AgentError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, AgentError>>,
    {
        let mut retries = 0;
        let mut backoff_ms = self.retry.initial_backoff_ms;

        loop {
            let err = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };

            let retryable = match &err {
                AgentError::RateLimited { retry_after } => Some(
                    retry_after
                        .map(|s| s * 1000)
                        .unwrap_or(backoff_ms)
                        .min(self.retry.max_backoff_ms),
                ),
                AgentError::Api {
                    status_code: Some(code),
                    ..
                } if *code >= 500 => Some(backoff_ms),
                _ => None,
            };

            let Some(wait_ms) = retryable else {
                if retries > 0 {
                    info!("{} failed after {} retries: {}", operation_name, retries, err);
                }
                return Err(err);
            };

            if retries >= self.retry.max_retries {
                error!("{} failed after {} retries: {}", operation_name, retries, err);
                return Err(err);
            }

            warn!(
                "{} failed ({}), retrying in {}ms (attempt {}/{})",
                operation_name,
                err,
                wait_ms,
                retries + 1,
                self.retry.max_retries
            );

            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            retries += 1;
            backoff_ms = (backoff_ms * 2).min(self.retry.max_backoff_ms);
        }
    }

    /// Run a chat completion and return the first choice's content.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, AgentError> {
        self.with_retry(
            || async {
                let request = ChatCompletionRequest {
                    model: model.to_string(),
                    messages: messages.clone(),
                    temperature,
                    max_tokens,
                    response_format: response_format.clone(),
                };
                self.chat_completion_inner(&request).await
            },
            "chat_completion",
        )
        .await
    }

    async fn chat_completion_inner(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, AgentError> {
        debug!(
            "Creating chat completion with {} messages, model {}",
            request.messages.len(),
            request.model
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!("Rate limited by model API");
                return Err(AgentError::RateLimited { retry_after });
            }

            if let Ok(error_resp) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                error!(
                    "Model API error: {} (type: {:?})",
                    error_resp.error.message, error_resp.error.error_type
                );
                return Err(AgentError::Api {
                    message: error_resp.error.message,
                    status_code: Some(status.as_u16()),
                });
            }

            return Err(AgentError::Api {
                message: error_text,
                status_code: Some(status.as_u16()),
            });
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::Api {
                message: "No completion returned".to_string(),
                status_code: None,
            })
    }
}
