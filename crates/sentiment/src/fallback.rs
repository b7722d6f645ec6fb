//! DuckDuckGo instant-answer fallback.
//!
//! Keyword-derived sentiment from public search snippets. Low confidence,
//! so scores are capped at +/-0.5; the 7-day horizon is unavailable from
//! this backend and reads 0.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use papertrade_core::{SentimentSnapshot, SentimentSource};
use std::time::Duration;

const POSITIVE_KEYWORDS: &[&str] = &[
    "surge",
    "soar",
    "rally",
    "gain",
    "rise",
    "bullish",
    "growth",
    "breakthrough",
    "adoption",
    "institutional",
    "etf",
    "approval",
    "milestone",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "crash",
    "plunge",
    "drop",
    "fall",
    "bearish",
    "decline",
    "hack",
    "scam",
    "ban",
    "lawsuit",
    "concern",
    "risk",
    "loss",
];

/// Fallback search backend.
pub struct DuckDuckGoProvider {
    client: reqwest::Client,
    api_url: String,
}

impl DuckDuckGoProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (compatible; papertrade/0.1)")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: "https://api.duckduckgo.com/".to_string(),
        })
    }
}

#[async_trait]
impl SentimentSource for DuckDuckGoProvider {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentSnapshot> {
        let asset = symbol.split('/').next().unwrap_or(symbol);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("q", format!("{asset} cryptocurrency news")),
                ("format", "json".to_string()),
                ("no_html", "1".to_string()),
                ("skip_disambig", "1".to_string()),
            ])
            .send()
            .await
            .context("fallback search request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("fallback search error: HTTP {status}"));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .context("failed to parse fallback search response")?;

        let (text, citations) = collect_snippets(&data);
        if text.len() < 20 {
            return Err(anyhow!("fallback search returned no usable snippets"));
        }

        let score = keyword_score(&text);
        Ok(SentimentSnapshot::new(
            symbol,
            Utc::now(),
            score,
            0.0,
            0.0,
            serde_json::json!({
                "model": "duckduckgo-fallback",
                "citations": citations,
                "data_quality": "low-confidence-fallback",
            }),
        ))
    }
}

/// Gathers the abstract and related-topic texts plus up to five source URLs.
fn collect_snippets(data: &serde_json::Value) -> (String, Vec<String>) {
    let mut snippets = Vec::new();
    let mut citations = Vec::new();

    if let Some(abstract_text) = data["Abstract"].as_str() {
        if !abstract_text.is_empty() {
            snippets.push(abstract_text.to_string());
        }
    }
    if let Some(topics) = data["RelatedTopics"].as_array() {
        for topic in topics.iter().take(5) {
            if let Some(text) = topic["Text"].as_str() {
                snippets.push(text.to_string());
            }
            if let Some(url) = topic["FirstURL"].as_str() {
                citations.push(url.to_string());
            }
        }
    }

    (snippets.join(" "), citations)
}

/// Keyword-ratio sentiment in `[-0.5, +0.5]`.
#[must_use]
pub fn keyword_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let positive = POSITIVE_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count() as f64;
    let negative = NEGATIVE_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count() as f64;

    let total = positive + negative;
    if total == 0.0 {
        return 0.0;
    }
    ((positive - negative) / total).clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_score_positive() {
        let score = keyword_score("ETF approval sparks rally and institutional adoption");
        assert_eq!(score, 0.5);
    }

    #[test]
    fn test_keyword_score_negative() {
        let score = keyword_score("exchange hack triggers crash, lawsuit follows");
        assert_eq!(score, -0.5);
    }

    #[test]
    fn test_keyword_score_mixed() {
        // Two positive (rally, gain), one negative (risk).
        let score = keyword_score("rally continues with gain despite risk");
        assert!((score - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_score_empty() {
        assert_eq!(keyword_score("nothing noteworthy"), 0.0);
    }

    #[test]
    fn test_collect_snippets() {
        let data = serde_json::json!({
            "Abstract": "Bitcoin overview",
            "RelatedTopics": [
                { "Text": "Price rally continues", "FirstURL": "https://example.com/a" },
                { "Text": "ETF news", "FirstURL": "https://example.com/b" }
            ]
        });
        let (text, citations) = collect_snippets(&data);
        assert!(text.contains("Bitcoin overview"));
        assert!(text.contains("Price rally continues"));
        assert_eq!(citations.len(), 2);
    }
}
