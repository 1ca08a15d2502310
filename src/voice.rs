//! Speech collaborator
//!
//! Speech-to-text for voice queries and text-to-speech for voice-mode
//! responses. The HTTP implementation targets a speech service configured via
//! `SPEECH_API_BASE_URL`; the mock keeps voice endpoints testable offline.

use crate::error::OrchestrationError;
use crate::Result;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::info;

/// Contract for the speech collaborator.
#[async_trait]
pub trait SpeechCollaborator: Send + Sync {
    async fn speech_to_text(&self, audio: &[u8]) -> Result<String>;
    async fn text_to_speech(&self, text: &str) -> Result<Vec<u8>>;
}

/// HTTP-backed speech service client.
pub struct SpeechApiClient {
    client: Client,
    base_url: String,
}

impl SpeechApiClient {
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("SPEECH_API_BASE_URL").ok()?;

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(60))
            .build()
            .ok()?;

        Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    audio_base64: String,
}

#[async_trait]
impl SpeechCollaborator for SpeechApiClient {
    async fn speech_to_text(&self, audio: &[u8]) -> Result<String> {
        let url = format!("{}/v1/transcribe", self.base_url);
        let payload = json!({
            "audio_base64": base64::engine::general_purpose::STANDARD.encode(audio),
        });

        info!(bytes = audio.len(), "Transcribing voice query");

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| OrchestrationError::SpeechError(format!("transcription request: {}", e)))?;

        if !response.status().is_success() {
            return Err(OrchestrationError::SpeechError(format!(
                "speech service returned {}",
                response.status()
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| OrchestrationError::SpeechError(format!("transcription parse: {}", e)))?;

        Ok(body.text)
    }

    async fn text_to_speech(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/synthesize", self.base_url);

        let response = self
            .client
            .post(url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| OrchestrationError::SpeechError(format!("synthesis request: {}", e)))?;

        if !response.status().is_success() {
            return Err(OrchestrationError::SpeechError(format!(
                "speech service returned {}",
                response.status()
            )));
        }

        let body: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| OrchestrationError::SpeechError(format!("synthesis parse: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(body.audio_base64)
            .map_err(|e| OrchestrationError::SpeechError(format!("synthesis decode: {}", e)))
    }
}

/// Mock speech collaborator for tests and offline demos.
pub struct MockSpeech;

#[async_trait]
impl SpeechCollaborator for MockSpeech {
    async fn speech_to_text(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Err(OrchestrationError::SpeechError(
                "empty audio payload".to_string(),
            ));
        }
        // The mock treats the payload as UTF-8 text, which keeps voice-path
        // tests deterministic end to end.
        String::from_utf8(audio.to_vec())
            .map_err(|_| OrchestrationError::SpeechError("unrecognized audio".to_string()))
    }

    async fn text_to_speech(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_round_trip() {
        let speech = MockSpeech;
        let audio = speech.text_to_speech("what is RSI?").await.unwrap();
        let text = speech.speech_to_text(&audio).await.unwrap();
        assert_eq!(text, "what is RSI?");
    }

    #[tokio::test]
    async fn test_mock_rejects_empty_audio() {
        let speech = MockSpeech;
        assert!(speech.speech_to_text(&[]).await.is_err());
    }
}
