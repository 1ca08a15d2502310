//! Analysis capability
//!
//! Selects a structured analysis kind from the query wording and asks the
//! data-API service to compute it.

use super::market::extract_ticker;
use super::{require_data_api, CapabilityHandler, DataApiClient};
use crate::models::Capability;
use crate::Result;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalysisKind {
    RegionSectorInvestment,
    PortfolioChange,
    SentimentTrends,
    PriceComparison,
    MarketTrends,
}

impl AnalysisKind {
    fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::RegionSectorInvestment => "region_sector_investment",
            AnalysisKind::PortfolioChange => "portfolio_change",
            AnalysisKind::SentimentTrends => "sentiment_trends",
            AnalysisKind::PriceComparison => "price_comparison",
            AnalysisKind::MarketTrends => "market_trends",
        }
    }
}

fn select_kind(query_lower: &str) -> AnalysisKind {
    if ["investment", "region", "sector"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        AnalysisKind::RegionSectorInvestment
    } else if ["portfolio", "change", "performance"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        AnalysisKind::PortfolioChange
    } else if ["sentiment", "news", "headlines"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        AnalysisKind::SentimentTrends
    } else if ["compare", "price"].iter().any(|w| query_lower.contains(w)) {
        AnalysisKind::PriceComparison
    } else if ["trends", "market"].iter().any(|w| query_lower.contains(w)) {
        AnalysisKind::MarketTrends
    } else {
        AnalysisKind::PortfolioChange
    }
}

fn extract_region(query_lower: &str) -> &'static str {
    if query_lower.contains("asia") {
        "Asia"
    } else {
        "US"
    }
}

pub struct AnalysisHandler {
    api: Option<DataApiClient>,
}

impl AnalysisHandler {
    pub fn new(api: Option<DataApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for AnalysisHandler {
    fn capability(&self) -> Capability {
        Capability::Analysis
    }

    fn description(&self) -> &'static str {
        "Performing financial analysis and calculations"
    }

    async fn execute(&self, query: &str, _interpretation: &str) -> Result<Value> {
        let api = require_data_api(&self.api)?;
        let query_lower = query.to_lowercase();
        let kind = select_kind(&query_lower);

        let parameters = match kind {
            AnalysisKind::RegionSectorInvestment | AnalysisKind::MarketTrends => json!({
                "region": extract_region(&query_lower),
                "sector": "Tech",
            }),
            AnalysisKind::PriceComparison => json!({
                "ticker": extract_ticker(query),
            }),
            AnalysisKind::PortfolioChange | AnalysisKind::SentimentTrends => json!({}),
        };

        api.post_json(
            "/v1/analysis/run",
            &json!({ "kind": kind.as_str(), "parameters": parameters }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_selection() {
        assert_eq!(
            select_kind("investment in asia tech sector"),
            AnalysisKind::RegionSectorInvestment
        );
        assert_eq!(
            select_kind("how did my portfolio perform"),
            AnalysisKind::PortfolioChange
        );
        assert_eq!(
            select_kind("sentiment of today's headlines"),
            AnalysisKind::SentimentTrends
        );
        assert_eq!(
            select_kind("compare tesla stock"),
            AnalysisKind::PriceComparison
        );
        assert_eq!(select_kind("broad market trends"), AnalysisKind::MarketTrends);
        assert_eq!(select_kind("something else"), AnalysisKind::PortfolioChange);
    }

    #[test]
    fn test_region_extraction() {
        assert_eq!(extract_region("trends in asia"), "Asia");
        assert_eq!(extract_region("trends overall"), "US");
    }

    #[tokio::test]
    async fn test_unconfigured_api_fails_typed() {
        let handler = AnalysisHandler::new(None);
        assert!(handler.execute("compare AAPL and TSLA", "").await.is_err());
    }
}
