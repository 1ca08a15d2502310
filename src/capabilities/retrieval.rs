//! Retrieval capability
//!
//! Similarity search over the stored document index.

use super::{require_data_api, CapabilityHandler, DataApiClient};
use crate::models::Capability;
use crate::Result;
use serde_json::{json, Value};

/// Number of ranked documents requested per search.
const SEARCH_K: usize = 3;

pub struct RetrievalHandler {
    api: Option<DataApiClient>,
}

impl RetrievalHandler {
    pub fn new(api: Option<DataApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for RetrievalHandler {
    fn capability(&self) -> Capability {
        Capability::Retrieval
    }

    fn description(&self) -> &'static str {
        "Searching stored documents and information"
    }

    async fn execute(&self, query: &str, _interpretation: &str) -> Result<Value> {
        let api = require_data_api(&self.api)?;

        let response = api
            .post_json(
                "/v1/retrieval/search",
                &json!({ "query": query, "k": SEARCH_K }),
            )
            .await?;

        Ok(json!({ "search_results": response }))
    }
}
