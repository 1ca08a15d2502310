//! Response synthesizer
//!
//! Turns the per-capability results (or failures) plus the original query
//! into one natural-language answer. The caller never receives an error in
//! place of an answer: a generator failure or an empty result set falls back
//! to a deterministic templated sentence.

use crate::language::TextGenerator;
use crate::models::{CapabilityState, CapabilityStatus};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Size budget for serialized capability results inside the prompt.
const RESULTS_PROMPT_BUDGET: usize = 2000;

/// Word budget for the synthesized answer.
const MAX_RESPONSE_WORDS: usize = 200;

pub struct ResponseSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl ResponseSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Synthesize the final answer. Infallible by contract.
    pub async fn synthesize(
        &self,
        query: &str,
        interpretation: &str,
        statuses: &[CapabilityStatus],
    ) -> String {
        let results = collect_results(statuses);

        if results.is_empty() {
            // Nothing to ground a summary in; explain the query directly.
            match self.generator.explain(query, "general").await {
                Ok(answer) => return answer,
                Err(e) => {
                    warn!("Response generation failed with no results: {}", e);
                    return format!(
                        "I couldn't gather data for your query \"{}\" right now. \
                         Please try again shortly.",
                        query
                    );
                }
            }
        }

        let results_json = truncate_chars(
            &serde_json::to_string_pretty(&results).unwrap_or_default(),
            RESULTS_PROMPT_BUDGET,
        );

        let prompt = format!(
            "User Query: \"{}\"\n\n\
             Query Interpretation: {}\n\n\
             Available Data:\n{}\n\n\
             Create a clear, helpful response that answers the user's question \
             using the available data. Be conversational and explain the \
             findings in simple terms.",
            query, interpretation, results_json
        );

        match self.generator.summarize(&prompt, MAX_RESPONSE_WORDS).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Response generation failed: {}", e);
                format!(
                    "I found some data for \"{}\" but couldn't generate a full \
                     response: {}",
                    query,
                    truncate_chars(&results_json, 200)
                )
            }
        }
    }
}

/// Completed capability payloads keyed by tag name, in a stable order.
fn collect_results(statuses: &[CapabilityStatus]) -> BTreeMap<String, Value> {
    statuses
        .iter()
        .filter(|status| status.state == CapabilityState::Completed)
        .filter_map(|status| {
            status
                .result
                .clone()
                .map(|result| (status.capability.to_string(), result))
        })
        .collect()
}

fn truncate_chars(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(budget).collect();
        format!("{}...", truncated)
    }
}
