//! Text-generation collaborator
//!
//! Summarization and explanation behind one trait so the coordinator and
//! synthesizer never depend on a concrete model service. The HTTP
//! implementation talks to the Mistral chat API with a long-lived
//! connection-pooled client; a failure is always reported distinctly from an
//! empty result.

use crate::error::OrchestrationError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Contract for the text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Condense `text` into at most roughly `max_words` words.
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String>;

    /// Explain `text` for the given audience ("general", "system", ...).
    async fn explain(&self, text: &str, audience: &str) -> Result<String>;
}

/// Reusable Mistral client (connection-pooled)
pub struct MistralClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl MistralClient {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, "open-mistral-nemo".to_string())
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            model,
            base_url: "https://api.mistral.ai/v1/chat/completions".to_string(),
        }
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::LlmError(
                "MISTRAL_API_KEY not configured".to_string(),
            ));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: 0.3,
            max_tokens: 1024,
        };

        info!(model = %self.model, "Calling Mistral API");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Mistral API request failed: {}", e);
                OrchestrationError::LlmError(format!("Mistral API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Mistral API error response: {}", error_text);
            return Err(OrchestrationError::LlmError(format!(
                "Mistral API error: {}",
                error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Mistral response: {}", e);
            OrchestrationError::LlmError(format!("Mistral parse error: {}", e))
        })?;

        let answer = chat_response
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| OrchestrationError::LlmError("No response from Mistral".to_string()))?;

        if answer.is_empty() {
            return Err(OrchestrationError::LlmError(
                "Empty response from Mistral".to_string(),
            ));
        }

        Ok(answer)
    }
}

#[async_trait]
impl TextGenerator for MistralClient {
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String> {
        let system = format!(
            "You are a professional financial assistant. Summarize the provided \
             material into a clear, conversational answer of at most {} words.",
            max_words
        );
        self.chat(&system, text).await
    }

    async fn explain(&self, text: &str, audience: &str) -> Result<String> {
        let system = format!(
            "You are a professional financial advisor and analyst. Explain the \
             following for a {} audience. Be structured and concise.",
            audience
        );
        self.chat(&system, text).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Deterministic generator for tests and offline demos.
/// Keeps the system functional without a model service.
pub struct MockTextGenerator;

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String> {
        let words: Vec<&str> = text.split_whitespace().take(max_words).collect();
        Ok(format!("Summary: {}", words.join(" ")))
    }

    async fn explain(&self, text: &str, audience: &str) -> Result<String> {
        Ok(format!("Explanation for {} audience: {}", audience, text))
    }
}

/// Generator that always fails, for exercising fallback paths in tests.
#[cfg(test)]
pub struct FailingTextGenerator;

#[cfg(test)]
#[async_trait]
impl TextGenerator for FailingTextGenerator {
    async fn summarize(&self, _text: &str, _max_words: usize) -> Result<String> {
        Err(OrchestrationError::LlmError("generator offline".to_string()))
    }

    async fn explain(&self, _text: &str, _audience: &str) -> Result<String> {
        Err(OrchestrationError::LlmError("generator offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "open-mistral-nemo".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "What is RSI?".to_string(),
            }],
            temperature: 0.3,
            max_tokens: 1024,
        };

        let json = serde_json::to_string(&request);
        assert!(json.is_ok());
        assert!(json.unwrap().contains("What is RSI?"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = MistralClient::new(String::new());
        let result = client.explain("what is RSI?", "general").await;

        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.to_lowercase().contains("api key") || message.contains("MISTRAL"));
    }

    #[tokio::test]
    async fn test_mock_generator_is_deterministic() {
        let generator = MockTextGenerator;
        let a = generator.summarize("one two three four", 2).await.unwrap();
        let b = generator.summarize("one two three four", 2).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "Summary: one two");
    }
}
