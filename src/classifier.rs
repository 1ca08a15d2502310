//! Query classifier
//!
//! Routes a free-text query to an ordered set of capability tags.
//! Pure and deterministic: identical input always yields identical output,
//! matching is case-insensitive, and ties fall back to the tag declaration
//! order in the pattern table.

use crate::models::Capability;

/// Static pattern tables — zero allocation, fixed declaration order
const MARKET_DATA_PATTERNS: &[&str] = &[
    "stock", "price", "share", "ticker", "market", "trading", "volume", "quote",
    "aapl", "googl", "msft", "tsla", "amzn", "meta", "nvda", "nflx", "spy", "qqq",
    "apple", "google", "alphabet", "microsoft", "tesla", "amazon", "nvidia", "netflix",
    "earnings", "revenue", "profit", "financial", "company", "corporation", "business",
    "dividend", "yield", "market cap", "p/e", "ratio", "valuation", "fundamentals",
    "nyse", "nasdaq", "exchange", "ipo", "listing", "symbol",
];

const ANALYSIS_PATTERNS: &[&str] = &[
    "analyz", "compar", "performance", "trend", "pattern", "forecast", "predict",
    "investment", "portfolio", "diversif", "risk", "return", "growth",
    "sector", "industry", "region", "economy", "economic",
    "sentiment", "bullish", "bearish", "volatile", "stability", "correlation",
    "recommend", "advise", "strategy", "allocation", "hedge", "balance",
    "tech", "technology", "automotive", "healthcare", "energy",
    "asia", "europe", "america", "emerging", "developed", "international",
];

const CONTENT_EXTRACTION_PATTERNS: &[&str] = &[
    "news", "headlines", "article", "report", "announcement", "press release",
    "latest", "recent", "current", "today", "update", "breaking", "development",
    "website", "url", "scrape", "extract", "content",
    "reuters", "bloomberg", "wsj", "financial times", "cnbc", "marketwatch",
    "sec filing", "10-k", "10-q", "8-k", "regulatory", "filing",
];

const RETRIEVAL_PATTERNS: &[&str] = &[
    "search", "find", "look", "retrieve", "show", "display",
    "database", "stored", "saved", "historical", "past", "previous",
    "document", "record", "data", "details", "facts",
    "research", "study", "insight", "knowledge", "learn",
];

const EXPLANATION_PATTERNS: &[&str] = &[
    "explain", "what", "how", "why", "define", "definition", "meaning",
    "tell", "describe", "detail", "elaborate", "clarify", "understand",
    "concept", "term", "process", "method", "principle", "theory",
    "help", "guide", "tutorial", "example", "overview", "summary",
];

/// Heuristic boost word lists
const FINANCIAL_TERMS: &[&str] = &[
    "stock", "price", "market", "financial", "company", "investment", "portfolio",
];

const ANALYTICAL_TRIGGERS: &[&str] = &[
    "analyze", "compare", "performance", "trend", "recommend", "vs", "versus", "better", "best",
];

const INFO_SEEKING_WORDS: &[&str] = &[
    "what", "how", "why", "tell", "explain", "show", "find", "search",
];

const RECENCY_WORDS: &[&str] = &["latest", "current", "today", "recent", "news", "update"];

const EDUCATIONAL_PHRASES: &[&str] = &[
    "explain", "what is", "how does", "definition", "meaning",
];

/// Maximum number of capabilities routed per query
const MAX_SELECTED: usize = 4;

fn patterns_for(capability: Capability) -> &'static [&'static str] {
    match capability {
        Capability::MarketData => MARKET_DATA_PATTERNS,
        Capability::Analysis => ANALYSIS_PATTERNS,
        Capability::ContentExtraction => CONTENT_EXTRACTION_PATTERNS,
        Capability::Retrieval => RETRIEVAL_PATTERNS,
        Capability::Explanation => EXPLANATION_PATTERNS,
    }
}

/// Outcome of classifying one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Selected tags in descending-score order; never empty, never more than 4.
    pub capabilities: Vec<Capability>,
    /// True when no tag scored and the fallback defaults were used.
    /// Informational, not an error.
    pub defaulted: bool,
}

/// Query classifier backed by the static pattern table.
pub struct QueryClassifier;

impl QueryClassifier {
    /// Classify a query into an ordered set of capability tags.
    pub fn classify(query: &str) -> Classification {
        let query_lower = query.to_lowercase();

        // Score each capability by total pattern occurrences
        let mut scores: Vec<(Capability, usize)> = Capability::ALL
            .iter()
            .map(|&capability| {
                let score: usize = patterns_for(capability)
                    .iter()
                    .map(|pattern| query_lower.matches(pattern).count())
                    .sum();
                (capability, score)
            })
            .collect();

        let has_financial_terms = contains_any(&query_lower, FINANCIAL_TERMS);

        // Heuristic boosts
        if has_financial_terms && score_of(&scores, Capability::MarketData) == 0 {
            add_score(&mut scores, Capability::MarketData, 1);
        }
        if contains_any(&query_lower, ANALYTICAL_TRIGGERS) {
            add_score(&mut scores, Capability::Analysis, 2);
        }
        if contains_any(&query_lower, INFO_SEEKING_WORDS) {
            add_score(&mut scores, Capability::Retrieval, 1);
        }
        if contains_any(&query_lower, RECENCY_WORDS) {
            add_score(&mut scores, Capability::ContentExtraction, 1);
        }
        if contains_any(&query_lower, EDUCATIONAL_PHRASES) {
            add_score(&mut scores, Capability::Explanation, 1);
        }

        // Descending score; stable sort keeps declaration order for ties
        let mut ranked: Vec<(Capability, usize)> = scores
            .iter()
            .copied()
            .filter(|(_, score)| *score > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        if ranked.is_empty() {
            let capabilities = if has_financial_terms {
                vec![Capability::MarketData, Capability::Explanation]
            } else {
                vec![Capability::Explanation, Capability::Retrieval]
            };
            return Classification {
                capabilities,
                defaulted: true,
            };
        }

        let max_score = ranked[0].1;
        let threshold = (0.3 * max_score as f32).max(1.0);

        let mut selected: Vec<Capability> = ranked
            .iter()
            .filter(|(_, score)| *score as f32 >= threshold)
            .map(|(capability, _)| *capability)
            .collect();

        // Ensure minimum diversity: extend with the next-highest-scoring tags
        if selected.len() < 2 {
            for (capability, _) in &ranked {
                if selected.len() >= 2 {
                    break;
                }
                if !selected.contains(capability) {
                    selected.push(*capability);
                }
            }
        }

        selected.truncate(MAX_SELECTED);

        Classification {
            capabilities: selected,
            defaulted: false,
        }
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.contains(word))
}

fn score_of(scores: &[(Capability, usize)], capability: Capability) -> usize {
    scores
        .iter()
        .find(|(c, _)| *c == capability)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

fn add_score(scores: &mut [(Capability, usize)], capability: Capability, amount: usize) {
    if let Some(entry) = scores.iter_mut().find(|(c, _)| *c == capability) {
        entry.1 += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let query = "Compare Tesla vs Apple performance";
        let first = QueryClassifier::classify(query);
        for _ in 0..5 {
            assert_eq!(QueryClassifier::classify(query), first);
        }
    }

    #[test]
    fn test_bounds() {
        let cases = [
            "What's the current price of AAPL stock?",
            "news",
            "a",
            "analyze compare trend recommend search find explain latest stock price",
        ];
        for case in cases {
            let result = QueryClassifier::classify(case);
            assert!(!result.capabilities.is_empty(), "empty for {:?}", case);
            assert!(result.capabilities.len() <= 4, "too many for {:?}", case);
        }
    }

    #[test]
    fn test_stock_price_query() {
        let result = QueryClassifier::classify("What's the current price of AAPL stock?");
        assert!(result.capabilities.contains(&Capability::MarketData));
        assert!(
            result.capabilities.contains(&Capability::Retrieval)
                || result.capabilities.contains(&Capability::Explanation)
        );
        assert!(!result.defaulted);
    }

    #[test]
    fn test_comparison_query() {
        let result = QueryClassifier::classify("Compare Tesla vs Apple performance");
        assert!(result.capabilities.contains(&Capability::Analysis));
        assert!(result.capabilities.contains(&Capability::MarketData));
        // Boosted analysis score should rank first
        assert_eq!(result.capabilities[0], Capability::Analysis);
    }

    #[test]
    fn test_educational_query() {
        let result = QueryClassifier::classify("Explain what a P/E ratio is");
        assert!(result.capabilities.contains(&Capability::Explanation));
        assert!(result.capabilities.contains(&Capability::MarketData));
    }

    #[test]
    fn test_empty_input_defaults() {
        let result = QueryClassifier::classify("");
        assert!(result.defaulted);
        assert_eq!(
            result.capabilities,
            vec![Capability::Explanation, Capability::Retrieval]
        );
    }

    #[test]
    fn test_unmatched_financial_input_defaults() {
        // "stock" is a financial term, so the fallback should lead with market data
        let result = QueryClassifier::classify("zzz");
        assert!(result.defaulted);
        assert_eq!(result.capabilities.len(), 2);
    }

    #[test]
    fn test_single_scoring_tag() {
        // Only one tag scores: nothing to extend with, selection stays at one
        let result = QueryClassifier::classify("bullish sentiment correlation");
        assert_eq!(result.capabilities, vec![Capability::Analysis]);
    }

    #[test]
    fn test_extension_to_two() {
        // "dividend" scores market_data twice over "yield"/"dividend"; the weak
        // retrieval hit from "data" is pulled in to reach two selections
        let result = QueryClassifier::classify("dividend yield data for microsoft dividend");
        assert!(result.capabilities.len() >= 2);
        assert_eq!(result.capabilities[0], Capability::MarketData);
    }

    #[test]
    fn test_case_insensitive() {
        let lower = QueryClassifier::classify("compare tesla vs apple performance");
        let upper = QueryClassifier::classify("COMPARE TESLA VS APPLE PERFORMANCE");
        assert_eq!(lower, upper);
    }
}
