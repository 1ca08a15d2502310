//! Explanation capability
//!
//! Answers educational phrasing directly through the text-generation
//! collaborator rather than a data service.

use super::CapabilityHandler;
use crate::language::TextGenerator;
use crate::models::Capability;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct ExplanationHandler {
    generator: Arc<dyn TextGenerator>,
}

impl ExplanationHandler {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for ExplanationHandler {
    fn capability(&self) -> Capability {
        Capability::Explanation
    }

    fn description(&self) -> &'static str {
        "Explaining the query interpretation"
    }

    async fn execute(&self, query: &str, interpretation: &str) -> Result<Value> {
        let prompt = if interpretation.is_empty() {
            query.to_string()
        } else {
            format!("{}\n\nContext: {}", query, interpretation)
        };

        let answer = self.generator.explain(&prompt, "general").await?;

        Ok(json!({ "answer": answer }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{FailingTextGenerator, MockTextGenerator};

    #[tokio::test]
    async fn test_explains_via_generator() {
        let handler = ExplanationHandler::new(Arc::new(MockTextGenerator));
        let output = handler.execute("what is a P/E ratio", "").await.unwrap();
        let answer = output["answer"].as_str().unwrap();
        assert!(answer.contains("P/E ratio"));
    }

    #[tokio::test]
    async fn test_generator_failure_propagates_as_error() {
        let handler = ExplanationHandler::new(Arc::new(FailingTextGenerator));
        assert!(handler.execute("what is RSI", "").await.is_err());
    }
}
