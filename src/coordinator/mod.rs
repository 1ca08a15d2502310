//! Execution coordinator
//!
//! Drives one session end-to-end:
//! initializing → routing → executing → {completed | failed}
//!
//! Capabilities run strictly one at a time within a session, never
//! concurrently, to avoid bursts against rate-limited collaborators and to
//! keep progress reporting monotonic. An isolated capability failure is
//! recorded and never aborts the loop; only a fault outside the
//! per-capability boundary marks the session failed.

use crate::capabilities::CapabilityRegistry;
use crate::classifier::QueryClassifier;
use crate::error::OrchestrationError;
use crate::language::TextGenerator;
use crate::models::{
    CapabilityState, CapabilityStatus, QueryResponse, SessionStatus,
};
use crate::session::SessionManager;
use crate::synthesizer::ResponseSynthesizer;
use crate::voice::SpeechCollaborator;
use crate::Result;
use base64::Engine;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default bound on one capability collaborator call. A stalled collaborator
/// becomes a failed CapabilityStatus instead of stalling the session.
pub const DEFAULT_CAPABILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Progress share reserved for the capability execution phase (20 → 85).
const EXECUTION_PROGRESS_SPAN: f32 = 65.0;

pub struct ExecutionCoordinator {
    registry: CapabilityRegistry,
    sessions: Arc<SessionManager>,
    generator: Arc<dyn TextGenerator>,
    speech: Arc<dyn SpeechCollaborator>,
    synthesizer: ResponseSynthesizer,
    capability_timeout: Duration,
}

impl ExecutionCoordinator {
    pub fn new(
        registry: CapabilityRegistry,
        sessions: Arc<SessionManager>,
        generator: Arc<dyn TextGenerator>,
        speech: Arc<dyn SpeechCollaborator>,
    ) -> Self {
        let synthesizer = ResponseSynthesizer::new(generator.clone());
        Self {
            registry,
            sessions,
            generator,
            speech,
            synthesizer,
            capability_timeout: DEFAULT_CAPABILITY_TIMEOUT,
        }
    }

    pub fn with_capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Process one free-text query end to end.
    pub async fn run(
        &self,
        query: &str,
        voice_mode: bool,
        include_debug: bool,
    ) -> Result<QueryResponse> {
        let session_id = self.sessions.create(query).await;

        match self
            .run_session(session_id, query, voice_mode, include_debug)
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => {
                self.sessions
                    .update_step(
                        session_id,
                        &format!("Failed: {}", e),
                        SessionStatus::Failed,
                        0.0,
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Process a voice query: speech-to-text, then the normal pipeline.
    pub async fn run_voice(
        &self,
        audio: &[u8],
        voice_mode: bool,
        include_debug: bool,
    ) -> Result<QueryResponse> {
        let query = self.speech.speech_to_text(audio).await?;
        self.run(query.trim(), voice_mode, include_debug).await
    }

    async fn run_session(
        &self,
        session_id: Uuid,
        query: &str,
        voice_mode: bool,
        include_debug: bool,
    ) -> Result<QueryResponse> {
        info!(session_id = %session_id, query = %query, "Processing query");

        // === INTERPRET ===
        self.sessions
            .update_step(session_id, "Interpreting query", SessionStatus::Initializing, 5.0)
            .await;
        let interpretation = self.interpret_query(query).await;

        // === ROUTE ===
        self.sessions
            .update_step(session_id, "Routing to capabilities", SessionStatus::Routing, 10.0)
            .await;

        let classification = QueryClassifier::classify(query);
        if classification.defaulted {
            info!(session_id = %session_id, "Classifier found no strong signal, using defaults");
        }
        debug!(
            session_id = %session_id,
            capabilities = ?classification.capabilities,
            "Query routed"
        );

        for &capability in &classification.capabilities {
            self.sessions
                .upsert_capability_status(session_id, CapabilityStatus::waiting(capability))
                .await;
        }

        self.sessions
            .update_step(session_id, "Executing capabilities", SessionStatus::Executing, 20.0)
            .await;

        // === EXECUTE ===
        let total = classification.capabilities.len();
        for (i, &capability) in classification.capabilities.iter().enumerate() {
            let progress = 20.0 + ((i + 1) as f32 / total as f32) * EXECUTION_PROGRESS_SPAN;

            self.sessions
                .update_step(
                    session_id,
                    &format!("Executing {}", capability.display_name()),
                    SessionStatus::Executing,
                    progress,
                )
                .await;

            let status = self
                .execute_capability(session_id, capability, query, &interpretation)
                .await;
            self.sessions
                .upsert_capability_status(session_id, status)
                .await;
        }

        // === SYNTHESIZE ===
        self.sessions
            .update_step(session_id, "Generating response", SessionStatus::Executing, 85.0)
            .await;

        let session = self.sessions.get(session_id).await.map_err(|_| {
            OrchestrationError::OrchestrationFailure(format!(
                "session {} disappeared mid-flight",
                session_id
            ))
        })?;
        let statuses = session.capabilities_status;

        let response_text = self
            .synthesizer
            .synthesize(query, &interpretation, &statuses)
            .await;

        self.sessions
            .update_step(session_id, "Finalizing response", SessionStatus::Executing, 95.0)
            .await;

        // === VOICE ===
        let wav_audio_base64 = if voice_mode {
            self.render_voice(session_id, &response_text).await
        } else {
            None
        };

        // === COMPLETE ===
        self.sessions
            .update_step(session_id, "Completed", SessionStatus::Completed, 100.0)
            .await;

        let completed_count = statuses
            .iter()
            .filter(|status| status.state == CapabilityState::Completed)
            .count();
        let confidence = if completed_count > 0 { 0.9 } else { 0.3 };

        info!(
            session_id = %session_id,
            completed = completed_count,
            total,
            "Query completed"
        );

        let capabilities_used = if include_debug {
            statuses
        } else {
            // Result payloads are debug detail; lifecycle metadata is enough
            // for normal clients.
            statuses
                .into_iter()
                .map(|mut status| {
                    status.result = None;
                    status
                })
                .collect()
        };

        Ok(QueryResponse {
            response_text,
            capabilities_used,
            query_interpretation: interpretation,
            wav_audio_base64,
            confidence,
            session_id,
        })
    }

    /// Short paraphrase of the query for routing and prompts.
    /// A generator failure substitutes a template; this never aborts a session.
    async fn interpret_query(&self, query: &str) -> String {
        let prompt = format!(
            "Analyze this financial/business query and provide a brief \
             interpretation of what the user is asking for:\nQuery: \"{}\"",
            query
        );

        match self.generator.explain(&prompt, "system").await {
            Ok(interpretation) => interpretation,
            Err(e) => {
                warn!("Query interpretation failed: {}", e);
                format!("The user is asking about: {}", query)
            }
        }
    }

    /// Run one capability under the configured timeout. Any failure, including
    /// a timeout, becomes a failed CapabilityStatus; nothing escapes the loop.
    async fn execute_capability(
        &self,
        session_id: Uuid,
        capability: crate::models::Capability,
        query: &str,
        interpretation: &str,
    ) -> CapabilityStatus {
        let started_at = Utc::now();

        let Some(handler) = self.registry.get(capability) else {
            warn!(session_id = %session_id, %capability, "Capability not registered");
            return CapabilityStatus {
                capability,
                state: CapabilityState::Failed,
                description: "Capability not registered".to_string(),
                result: None,
                error: Some(format!("{} has no registered handler", capability)),
                started_at: Some(started_at),
                finished_at: Some(Utc::now()),
            };
        };

        self.sessions
            .upsert_capability_status(
                session_id,
                CapabilityStatus {
                    capability,
                    state: CapabilityState::Executing,
                    description: handler.description().to_string(),
                    result: None,
                    error: None,
                    started_at: Some(started_at),
                    finished_at: None,
                },
            )
            .await;

        let outcome = tokio::time::timeout(
            self.capability_timeout,
            handler.execute(query, interpretation),
        )
        .await;

        match outcome {
            Ok(Ok(result)) => {
                debug!(session_id = %session_id, %capability, "Capability completed");
                CapabilityStatus {
                    capability,
                    state: CapabilityState::Completed,
                    description: format!("{} completed", handler.description()),
                    result: Some(result),
                    error: None,
                    started_at: Some(started_at),
                    finished_at: Some(Utc::now()),
                }
            }
            Ok(Err(e)) => {
                warn!(session_id = %session_id, %capability, error = %e, "Capability failed");
                CapabilityStatus {
                    capability,
                    state: CapabilityState::Failed,
                    description: format!("{} failed", handler.description()),
                    result: None,
                    error: Some(e.to_string()),
                    started_at: Some(started_at),
                    finished_at: Some(Utc::now()),
                }
            }
            Err(_) => {
                warn!(session_id = %session_id, %capability, "Capability timed out");
                CapabilityStatus {
                    capability,
                    state: CapabilityState::Failed,
                    description: format!("{} timed out", handler.description()),
                    result: None,
                    error: Some(format!(
                        "timed out after {}s",
                        self.capability_timeout.as_secs()
                    )),
                    started_at: Some(started_at),
                    finished_at: Some(Utc::now()),
                }
            }
        }
    }

    /// Text-to-speech for voice mode. Failure is logged and the session
    /// proceeds without audio.
    async fn render_voice(&self, session_id: Uuid, text: &str) -> Option<String> {
        self.sessions
            .update_step(session_id, "Rendering audio", SessionStatus::Executing, 97.0)
            .await;

        match self.speech.text_to_speech(text).await {
            Ok(audio) => Some(base64::engine::general_purpose::STANDARD.encode(audio)),
            Err(e) => {
                warn!(session_id = %session_id, "Voice rendering failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{
        create_mock_registry, CapabilityHandler, CapabilityRegistry, FailingHandler,
    };
    use crate::language::MockTextGenerator;
    use crate::models::Capability;
    use crate::voice::MockSpeech;
    use serde_json::{json, Value};

    fn coordinator_with(registry: CapabilityRegistry) -> ExecutionCoordinator {
        ExecutionCoordinator::new(
            registry,
            Arc::new(SessionManager::default()),
            Arc::new(MockTextGenerator),
            Arc::new(MockSpeech),
        )
    }

    /// Handler that never returns within a test-sized timeout.
    struct StalledHandler;

    #[async_trait::async_trait]
    impl CapabilityHandler for StalledHandler {
        fn capability(&self) -> Capability {
            Capability::Retrieval
        }

        fn description(&self) -> &'static str {
            "Stalls forever"
        }

        async fn execute(&self, _query: &str, _interpretation: &str) -> crate::Result<Value> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn test_end_to_end_explanation_query() {
        let coordinator = coordinator_with(create_mock_registry());

        let response = coordinator
            .run("Explain what a P/E ratio is", false, true)
            .await
            .unwrap();

        assert!(!response.response_text.is_empty());
        assert_eq!(response.confidence, 0.9);

        let explanation = response
            .capabilities_used
            .iter()
            .find(|status| status.capability == Capability::Explanation)
            .expect("explanation capability selected");
        assert!(matches!(
            explanation.state,
            CapabilityState::Completed | CapabilityState::Failed
        ));

        // No status may be left mid-flight after completion
        for status in &response.capabilities_used {
            assert!(!matches!(
                status.state,
                CapabilityState::Waiting | CapabilityState::Executing
            ));
        }

        let session = coordinator.sessions().get(response.session_id).await.unwrap();
        assert_eq!(session.overall_status, SessionStatus::Completed);
        assert_eq!(session.progress_percentage, 100.0);
    }

    #[tokio::test]
    async fn test_all_capabilities_failing_still_completes() {
        let mut registry = CapabilityRegistry::new();
        for capability in Capability::ALL {
            registry.register(Arc::new(FailingHandler::new(capability)));
        }
        let coordinator = coordinator_with(registry);

        let response = coordinator
            .run("What's the current price of AAPL stock?", false, false)
            .await
            .unwrap();

        assert!(!response.response_text.is_empty());
        assert_eq!(response.confidence, 0.3);
        for status in &response.capabilities_used {
            assert_eq!(status.state, CapabilityState::Failed);
            assert!(status.error.is_some());
        }

        let session = coordinator.sessions().get(response.session_id).await.unwrap();
        assert_eq!(session.overall_status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_unregistered_capability_records_failure() {
        // Empty registry: every selected capability fails in isolation
        let coordinator = coordinator_with(CapabilityRegistry::new());

        let response = coordinator.run("latest market news", false, false).await.unwrap();
        assert!(!response.response_text.is_empty());
        assert!(response
            .capabilities_used
            .iter()
            .all(|status| status.state == CapabilityState::Failed));
    }

    #[tokio::test]
    async fn test_capability_timeout_becomes_failed_status() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(StalledHandler));
        let coordinator =
            coordinator_with(registry).with_capability_timeout(Duration::from_millis(50));

        // "search find retrieve" routes to retrieval, which stalls
        let response = coordinator
            .run("search and retrieve stored research documents", false, false)
            .await
            .unwrap();

        let retrieval = response
            .capabilities_used
            .iter()
            .find(|status| status.capability == Capability::Retrieval)
            .expect("retrieval selected");
        assert_eq!(retrieval.state, CapabilityState::Failed);
        assert!(retrieval.error.as_deref().unwrap_or("").contains("timed out"));

        let session = coordinator.sessions().get(response.session_id).await.unwrap();
        assert_eq!(session.overall_status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_voice_query_round_trip() {
        let coordinator = coordinator_with(create_mock_registry());

        let audio = b"Explain what a P/E ratio is".to_vec();
        let response = coordinator.run_voice(&audio, true, false).await.unwrap();

        assert!(!response.response_text.is_empty());
        assert!(response.wav_audio_base64.is_some());
    }

    #[tokio::test]
    async fn test_debug_flag_controls_result_payloads() {
        let coordinator = coordinator_with(create_mock_registry());

        let with_debug = coordinator.run("price of AAPL stock", false, true).await.unwrap();
        assert!(with_debug
            .capabilities_used
            .iter()
            .any(|status| status.result.is_some()));

        let without_debug = coordinator.run("price of AAPL stock", false, false).await.unwrap();
        assert!(without_debug
            .capabilities_used
            .iter()
            .all(|status| status.result.is_none()));
    }
}
