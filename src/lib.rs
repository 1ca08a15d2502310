//! Intelligent Financial Assistant Orchestrator
//!
//! Routes natural-language queries across independent data-fetching and
//! generation capabilities behind one entry point:
//! - Classifies a query into a fixed set of capability tags
//! - Dispatches it sequentially to the matching capability handlers
//! - Tracks live per-step execution progress for each session
//! - Synthesizes one natural-language answer from the partial results
//!
//! SESSION LIFECYCLE:
//! INITIALIZING → ROUTING → EXECUTING → {COMPLETED | FAILED}

pub mod api;
pub mod capabilities;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod language;
pub mod models;
pub mod session;
pub mod synthesizer;
pub mod voice;

pub use error::Result;

// Re-export common types
pub use classifier::{Classification, QueryClassifier};
pub use coordinator::ExecutionCoordinator;
pub use models::*;
pub use session::SessionManager;
