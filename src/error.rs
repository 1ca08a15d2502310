//! Error types for the query orchestration layer

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// One capability's collaborator call failed. Isolated: recorded on the
    /// session's CapabilityStatus and never escapes the execution loop.
    #[error("Capability failure: {0}")]
    CapabilityFailure(String),

    /// The text-generation collaborator failed or returned nothing.
    /// Recovered via the synthesizer's templated fallback.
    #[error("Synthesis failure: {0}")]
    SynthesisFailure(String),

    /// Client queried or deleted an unknown session id.
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// A fault outside any per-capability boundary. The only path that marks
    /// a session `failed` rather than `completed`.
    #[error("Orchestration failure: {0}")]
    OrchestrationFailure(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Speech error: {0}")]
    SpeechError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
