//! Capability handlers and registry
//!
//! Each capability tag maps to one implementation of the `CapabilityHandler`
//! trait, built once at startup into an enum-keyed registry. Handlers wrap
//! external collaborator services; their handles are shared, read-only
//! references handed to every session.

use crate::error::OrchestrationError;
use crate::language::TextGenerator;
use crate::models::Capability;
use crate::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub mod analysis;
pub mod explanation;
pub mod market;
pub mod retrieval;
pub mod scraping;

pub use analysis::AnalysisHandler;
pub use explanation::ExplanationHandler;
pub use market::MarketDataHandler;
pub use retrieval::RetrievalHandler;
pub use scraping::ScrapingHandler;

/// Contract for a single capability's execution.
///
/// `execute` must return structured data or a typed error; it never panics
/// and the coordinator converts any error into a failed CapabilityStatus.
#[async_trait::async_trait]
pub trait CapabilityHandler: Send + Sync {
    fn capability(&self) -> Capability;

    /// Human-readable description of the activity, shown while executing.
    fn description(&self) -> &'static str;

    async fn execute(&self, query: &str, interpretation: &str) -> Result<Value>;
}

/// Fixed mapping from capability tag to its handler.
pub struct CapabilityRegistry {
    handlers: HashMap<Capability, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn CapabilityHandler>) {
        self.handlers.insert(handler.capability(), handler);
    }

    pub fn get(&self, capability: Capability) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(&capability).cloned()
    }

    pub fn list(&self) -> Vec<Capability> {
        Capability::ALL
            .iter()
            .copied()
            .filter(|capability| self.handlers.contains_key(capability))
            .collect()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared client for the data-API service backing the market, scraping,
/// retrieval and analysis handlers.
#[derive(Clone)]
pub struct DataApiClient {
    client: Client,
    base_url: String,
}

impl DataApiClient {
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("DATA_API_BASE_URL").ok()?;

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .ok()?;

        Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                OrchestrationError::CapabilityFailure(format!(
                    "Data API request failed for {}: {}",
                    path, e
                ))
            })?;

        let status = response.status();
        let body = response.json::<Value>().await.map_err(|e| {
            OrchestrationError::CapabilityFailure(format!("Invalid JSON response: {}", e))
        })?;

        if !status.is_success() {
            return Err(OrchestrationError::CapabilityFailure(format!(
                "Data API returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(body)
    }
}

pub(crate) fn require_data_api(api: &Option<DataApiClient>) -> Result<&DataApiClient> {
    api.as_ref().ok_or_else(|| {
        OrchestrationError::CapabilityFailure("DATA_API_BASE_URL is not configured".to_string())
    })
}

/// Build the production registry from environment configuration.
/// Handlers whose backing service is unconfigured stay registered and report
/// a capability failure when invoked, which the coordinator records as a
/// failed status rather than aborting the session.
pub fn create_default_registry(generator: Arc<dyn TextGenerator>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    let data_api = DataApiClient::from_env();

    registry.register(Arc::new(MarketDataHandler::new(data_api.clone())));
    registry.register(Arc::new(AnalysisHandler::new(data_api.clone())));
    registry.register(Arc::new(ScrapingHandler::new(data_api.clone())));
    registry.register(Arc::new(RetrievalHandler::new(data_api)));
    registry.register(Arc::new(ExplanationHandler::new(generator)));

    registry
}

//
// ========== Mock handlers ==========
//

/// Canned handler keeping the system functional without collaborator services.
pub struct MockHandler {
    capability: Capability,
    description: &'static str,
    payload: Value,
}

impl MockHandler {
    pub fn new(capability: Capability, description: &'static str, payload: Value) -> Self {
        Self {
            capability,
            description,
            payload,
        }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for MockHandler {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn description(&self) -> &'static str {
        self.description
    }

    async fn execute(&self, _query: &str, _interpretation: &str) -> Result<Value> {
        Ok(self.payload.clone())
    }
}

/// Handler that always fails, for exercising the isolated-failure policy.
pub struct FailingHandler {
    capability: Capability,
}

impl FailingHandler {
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for FailingHandler {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn description(&self) -> &'static str {
        "Always fails"
    }

    async fn execute(&self, _query: &str, _interpretation: &str) -> Result<Value> {
        Err(OrchestrationError::CapabilityFailure(
            "collaborator unavailable".to_string(),
        ))
    }
}

/// Registry of deterministic canned handlers for tests and offline demos.
pub fn create_mock_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();

    registry.register(Arc::new(MockHandler::new(
        Capability::MarketData,
        "Fetching stock market data and financial information",
        json!({ "symbol": "AAPL", "price": 150.50, "change": 2.5, "volume": 1_000_000 }),
    )));
    registry.register(Arc::new(MockHandler::new(
        Capability::Analysis,
        "Performing financial analysis and calculations",
        json!({ "total_value": 100000.0, "diversification_score": 0.75, "risk_level": "medium" }),
    )));
    registry.register(Arc::new(MockHandler::new(
        Capability::ContentExtraction,
        "Scraping web content and extracting information",
        json!({ "headlines": ["Markets rally on earnings", "Tech stocks lead gains"] }),
    )));
    registry.register(Arc::new(MockHandler::new(
        Capability::Retrieval,
        "Searching stored documents and information",
        json!({ "search_results": [{ "content": "P/E ratio primer", "score": 0.92 }] }),
    )));
    registry.register(Arc::new(MockHandler::new(
        Capability::Explanation,
        "Explaining the query interpretation",
        json!({ "answer": "A price-to-earnings ratio relates a share price to earnings." }),
    )));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_all_capabilities() {
        let registry = create_mock_registry();
        assert_eq!(registry.list().len(), Capability::ALL.len());
        for capability in Capability::ALL {
            assert!(registry.get(capability).is_some());
        }
    }

    #[tokio::test]
    async fn test_mock_handler_execution() {
        let registry = create_mock_registry();
        let handler = registry.get(Capability::MarketData).unwrap();
        let output = handler.execute("price of AAPL", "").await.unwrap();
        assert_eq!(output["symbol"], "AAPL");
    }

    #[tokio::test]
    async fn test_failing_handler_reports_capability_failure() {
        let handler = FailingHandler::new(Capability::Retrieval);
        let result = handler.execute("q", "").await;
        assert!(matches!(
            result,
            Err(OrchestrationError::CapabilityFailure(_))
        ));
    }
}
