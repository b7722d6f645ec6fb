//! Primary sentiment provider backed by an online-search completion API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use papertrade_core::{SentimentSnapshot, SentimentSource};
use std::time::Duration;

/// Sentiment provider that asks a search-grounded model for a score and a
/// short summary, once per horizon (24 hours and 7 days).
pub struct SearchSentimentProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl SearchSentimentProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn build_query(symbol: &str, horizon: &str) -> String {
        let asset = symbol.split('/').next().unwrap_or(symbol);
        format!(
            "Analyze market sentiment for {asset} cryptocurrency over the last {horizon}. \
             Provide: 1) sentiment score from -1 (bearish) to +1 (bullish), \
             2) brief summary of recent news. Keep the response under 100 words."
        )
    }

    async fn score_for(&self, symbol: &str, horizon: &str, recency: &str) -> Result<(f64, String)> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a financial analyst. Analyze sentiment concisely with a \
                                score from -1 (very bearish) to +1 (very bullish) and brief reasoning."
                },
                { "role": "user", "content": Self::build_query(symbol, horizon) }
            ],
            "max_tokens": 200,
            "temperature": 0.2,
            "search_recency_filter": recency,
            "stream": false
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("sentiment request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("sentiment API error ({status}): {body}"));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .context("failed to parse sentiment response")?;
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("sentiment response missing content"))?
            .to_string();

        Ok((extract_score(&content), content))
    }
}

#[async_trait]
impl SentimentSource for SearchSentimentProvider {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentSnapshot> {
        let (sent_24h, summary_24h) = self.score_for(symbol, "24 hours", "day").await?;
        let (sent_7d, _) = self.score_for(symbol, "7 days", "week").await?;

        Ok(SentimentSnapshot::new(
            symbol,
            Utc::now(),
            sent_24h,
            sent_7d,
            0.0,
            serde_json::json!({
                "model": self.model,
                "summary": summary_24h,
            }),
        ))
    }
}

/// Extracts a sentiment score from model prose: keyword tone first, then a
/// numeric scan of lines mentioning "score" or "sentiment".
#[must_use]
pub fn extract_score(content: &str) -> f64 {
    let lower = content.to_lowercase();

    if lower.contains("bullish") || lower.contains("positive") {
        if lower.contains("very") || lower.contains("strong") {
            return 0.7;
        }
        return 0.4;
    }
    if lower.contains("bearish") || lower.contains("negative") {
        if lower.contains("very") || lower.contains("strong") {
            return -0.7;
        }
        return -0.4;
    }
    if lower.contains("neutral") || lower.contains("mixed") {
        return 0.0;
    }

    for line in content.lines() {
        let line_lower = line.to_lowercase();
        if !line_lower.contains("score") && !line_lower.contains("sentiment") {
            continue;
        }
        for word in line.split_whitespace() {
            let cleaned = word.trim_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-');
            if let Ok(score) = cleaned.parse::<f64>() {
                if (-1.0..=1.0).contains(&score) {
                    return score;
                }
            }
        }
    }

    0.0
}
