//! Content-extraction capability
//!
//! Pulls headlines or generic text from a web page. A URL embedded in the
//! query wins; otherwise extraction targets a financial-news default.

use super::{require_data_api, CapabilityHandler, DataApiClient};
use crate::models::Capability;
use crate::Result;
use serde_json::{json, Value};

const DEFAULT_NEWS_URL: &str = "https://finance.yahoo.com";

/// First http(s) URL found in the query, if any.
pub(crate) fn extract_url(query: &str) -> Option<String> {
    for scheme in ["https://", "http://"] {
        if let Some(start) = query.find(scheme) {
            let rest = &query[start..];
            let end = rest
                .find(char::is_whitespace)
                .unwrap_or(rest.len());
            return Some(rest[..end].trim_end_matches([',', '.', ')']).to_string());
        }
    }
    None
}

pub struct ScrapingHandler {
    api: Option<DataApiClient>,
}

impl ScrapingHandler {
    pub fn new(api: Option<DataApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for ScrapingHandler {
    fn capability(&self) -> Capability {
        Capability::ContentExtraction
    }

    fn description(&self) -> &'static str {
        "Scraping web content and extracting information"
    }

    async fn execute(&self, query: &str, _interpretation: &str) -> Result<Value> {
        let api = require_data_api(&self.api)?;
        let url = extract_url(query).unwrap_or_else(|| DEFAULT_NEWS_URL.to_string());

        let query_lower = query.to_lowercase();
        let wants_headlines = ["headlines", "news"]
            .iter()
            .any(|w| query_lower.contains(w));

        if wants_headlines {
            api.post_json(
                "/v1/scrape/headlines",
                &json!({ "url": url, "selector": "h3" }),
            )
            .await
        } else {
            api.post_json("/v1/scrape/text", &json!({ "url": url })).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_extraction() {
        assert_eq!(
            extract_url("summarize https://example.com/article today"),
            Some("https://example.com/article".to_string())
        );
        assert_eq!(
            extract_url("fetch http://news.site/a."),
            Some("http://news.site/a".to_string())
        );
        assert_eq!(extract_url("latest market news"), None);
    }

    #[tokio::test]
    async fn test_unconfigured_api_fails_typed() {
        let handler = ScrapingHandler::new(None);
        assert!(handler.execute("latest news", "").await.is_err());
    }
}
