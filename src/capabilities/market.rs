//! Market data capability
//!
//! Resolves a ticker from the query text and fetches the matching financial
//! snapshot (price, earnings or company profile) from the data-API service.

use super::{require_data_api, CapabilityHandler, DataApiClient};
use crate::models::Capability;
use crate::Result;
use serde_json::{json, Value};

/// Company-name aliases resolved ahead of raw ticker extraction.
const TICKER_ALIASES: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("aapl", "AAPL"),
    ("tesla", "TSLA"),
    ("tsla", "TSLA"),
    ("microsoft", "MSFT"),
    ("msft", "MSFT"),
    ("google", "GOOGL"),
    ("googl", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("amzn", "AMZN"),
    ("meta", "META"),
    ("facebook", "META"),
    ("nvidia", "NVDA"),
    ("nvda", "NVDA"),
];

/// Common uppercase words that look like tickers but are not.
const TICKER_STOP_WORDS: &[&str] = &[
    "WHAT", "THE", "AND", "FOR", "WITH", "FROM", "THAT", "THIS", "HOW", "ARE", "CAN", "WILL",
];

/// Extract the most likely ticker symbol from a query, defaulting to AAPL.
pub(crate) fn extract_ticker(query: &str) -> String {
    let query_lower = query.to_lowercase();

    for (name, ticker) in TICKER_ALIASES {
        if query_lower.contains(name) {
            return (*ticker).to_string();
        }
    }

    // 2-5 letter all-uppercase tokens, minus common words
    for token in query.split(|c: char| !c.is_ascii_alphanumeric()) {
        let len = token.len();
        if (2..=5).contains(&len)
            && token.chars().all(|c| c.is_ascii_uppercase())
            && !TICKER_STOP_WORDS.contains(&token)
        {
            return token.to_string();
        }
    }

    "AAPL".to_string()
}

enum MarketRequest {
    Price,
    Earnings,
    CompanyInfo,
}

fn select_request(query: &str) -> MarketRequest {
    let query_lower = query.to_lowercase();
    if ["price", "stock", "share"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        MarketRequest::Price
    } else if ["earnings", "financial"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        MarketRequest::Earnings
    } else if ["company", "info", "information"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        MarketRequest::CompanyInfo
    } else {
        MarketRequest::Price
    }
}

pub struct MarketDataHandler {
    api: Option<DataApiClient>,
}

impl MarketDataHandler {
    pub fn new(api: Option<DataApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for MarketDataHandler {
    fn capability(&self) -> Capability {
        Capability::MarketData
    }

    fn description(&self) -> &'static str {
        "Fetching stock market data and financial information"
    }

    async fn execute(&self, query: &str, _interpretation: &str) -> Result<Value> {
        let api = require_data_api(&self.api)?;
        let ticker = extract_ticker(query);

        let path = match select_request(query) {
            MarketRequest::Price => "/v1/market/price",
            MarketRequest::Earnings => "/v1/market/earnings",
            MarketRequest::CompanyInfo => "/v1/market/company",
        };

        api.post_json(path, &json!({ "ticker": ticker })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_name_resolution() {
        assert_eq!(extract_ticker("how is tesla doing"), "TSLA");
        assert_eq!(extract_ticker("compare Apple and Microsoft"), "AAPL");
        assert_eq!(extract_ticker("facebook stock"), "META");
    }

    #[test]
    fn test_uppercase_ticker_extraction() {
        assert_eq!(extract_ticker("price of NFLX today"), "NFLX");
        // Stop words never read as tickers
        assert_eq!(extract_ticker("WHAT is THE price"), "AAPL");
    }

    #[test]
    fn test_default_ticker() {
        assert_eq!(extract_ticker("show me the market"), "AAPL");
    }

    #[tokio::test]
    async fn test_unconfigured_api_fails_typed() {
        let handler = MarketDataHandler::new(None);
        let result = handler.execute("price of AAPL", "").await;
        assert!(matches!(
            result,
            Err(crate::error::OrchestrationError::CapabilityFailure(_))
        ));
    }
}
