//! Core data models for the assistant orchestrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Capability tags =================
//

/// The fixed, closed set of capabilities a query can be routed to.
/// Declaration order is the tie-break order used by the classifier;
/// not user-extensible at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    MarketData,
    Analysis,
    ContentExtraction,
    Retrieval,
    Explanation,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::MarketData,
        Capability::Analysis,
        Capability::ContentExtraction,
        Capability::Retrieval,
        Capability::Explanation,
    ];

    /// Human-readable handler name, matching the status records shown to clients.
    pub fn display_name(&self) -> &'static str {
        match self {
            Capability::MarketData => "Market Agent",
            Capability::Analysis => "Analysis Agent",
            Capability::ContentExtraction => "Scraping Agent",
            Capability::Retrieval => "Retriever Agent",
            Capability::Explanation => "Language Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Capability::MarketData => "Stock prices, company info, earnings data",
            Capability::Analysis => "Portfolio analysis, sentiment analysis, market trends",
            Capability::ContentExtraction => "Web content extraction and headlines",
            Capability::Retrieval => "Document search and retrieval",
            Capability::Explanation => "Text summarization and explanation",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::MarketData => "market_data",
            Capability::Analysis => "analysis",
            Capability::ContentExtraction => "content_extraction",
            Capability::Retrieval => "retrieval",
            Capability::Explanation => "explanation",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Session lifecycle =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Initializing,
    Routing,
    Executing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityState {
    Waiting,
    Executing,
    Completed,
    Failed,
}

/// Lifecycle record for one capability's execution within a session.
/// Unique per capability name; a later update replaces the existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityStatus {
    pub capability: Capability,
    pub state: CapabilityState,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl CapabilityStatus {
    pub fn waiting(capability: Capability) -> Self {
        Self {
            capability,
            state: CapabilityState::Waiting,
            description: "Waiting for execution".to_string(),
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// One query's end-to-end execution record.
///
/// Mutated only by the coordinator that owns the session; `progress` is
/// monotonically non-decreasing for the life of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub query: String,
    pub current_step: String,
    pub overall_status: SessionStatus,
    pub progress_percentage: f32,
    pub capabilities_status: Vec<CapabilityStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//
// ================= API shapes =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub voice_mode: bool,
    #[serde(default)]
    pub include_debug_info: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceQueryRequest {
    pub audio_base64: String,
    #[serde(default = "default_true")]
    pub voice_mode: bool,
    #[serde(default)]
    pub include_debug_info: bool,
}

fn default_true() -> bool {
    true
}

/// Final answer for one submitted query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response_text: String,
    pub capabilities_used: Vec<CapabilityStatus>,
    pub query_interpretation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wav_audio_base64: Option<String>,
    /// Confidence in query understanding (0-1)
    pub confidence: f32,
    pub session_id: Uuid,
}
