//! Language-model completion service abstraction
//!
//! The constraint extractor and candidate verifier both consume this
//! single-method capability. Prompts are fixed templates so that a
//! deterministic service configuration yields reproducible extractions.
//! `ScriptedCompletion` substitutes literal responses in tests.

use crate::config::CompletionConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Trait for language-model completions
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete a prompt, returning the raw response text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat-completion client
pub struct OpenAiCompletion {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiCompletion {
    /// Create a new completion client from configuration
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| AppError::Configuration {
                message: "Completion API key not configured".to_string(),
            })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_retries: config.max_retries,
            timeout,
        })
    }

    /// Make a request with bounded retry and exponential backoff
    async fn request_with_retry(&self, prompt: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Completion request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::CompletionError {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            // Zero temperature for reproducible extraction/verification
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::CompletionTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::CompletionError {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CompletionError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::CompletionError {
                message: format!("Failed to parse response: {}", e),
            })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::CompletionError {
                message: "Empty response".to_string(),
            })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.request_with_retry(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted completion client for testing.
///
/// Returns queued responses in order; an exhausted queue yields a
/// completion error, exercising the degradation paths.
#[derive(Default)]
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedCompletion {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Queue an additional response
    pub fn push(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .expect("scripted completion lock poisoned")
            .push_back(response.into());
    }

    /// Number of responses still queued
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .expect("scripted completion lock poisoned")
            .len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.responses
            .lock()
            .expect("scripted completion lock poisoned")
            .pop_front()
            .ok_or_else(|| AppError::CompletionError {
                message: "Scripted completion exhausted".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_completion_in_order() {
        let client = ScriptedCompletion::new(["first", "second"]);
        assert_eq!(client.complete("a").await.unwrap(), "first");
        assert_eq!(client.complete("b").await.unwrap(), "second");
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn test_scripted_completion_exhausted_errors() {
        let client = ScriptedCompletion::new(Vec::<String>::new());
        let err = client.complete("anything").await.unwrap_err();
        assert!(err.is_degradable());
    }
}
