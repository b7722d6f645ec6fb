//! Dependency wiring: adapters, providers, and agents from config.
//!
//! Missing optional keys degrade rather than fail: no LLM key disables
//! both agents (the deterministic signal executes directly), and no
//! sentiment key drops straight to the fallback search backend.

use anyhow::Result;
use papertrade_agents::{Advisor, Consultant, OpenRouterTransport};
use papertrade_core::{AppConfig, ExchangeAdapter, SentimentSource};
use papertrade_data::{DatabaseClient, SentimentRepository};
use papertrade_exchange_binance::BinanceSpotAdapter;
use papertrade_orchestrator::{AgentPair, CycleRunner};
use papertrade_sentiment::{
    DuckDuckGoProvider, ProviderChain, SearchSentimentProvider, SentimentService,
};
use std::sync::Arc;
use std::time::Duration;

pub fn exchange(config: &AppConfig) -> Result<Arc<dyn ExchangeAdapter>> {
    Ok(Arc::new(BinanceSpotAdapter::new(
        &config.exchange.api_url,
        config.exchange.rate_limit_per_second,
    )?))
}

fn sentiment(db: &DatabaseClient, config: &AppConfig) -> Result<Arc<SentimentService>> {
    let mut sources: Vec<Arc<dyn SentimentSource>> = Vec::new();
    if let Some(api_key) = &config.sentiment.api_key {
        sources.push(Arc::new(SearchSentimentProvider::new(
            &config.sentiment.api_url,
            api_key,
            &config.sentiment.model,
        )?));
    } else {
        tracing::warn!("no sentiment API key, using fallback search backend only");
    }
    sources.push(Arc::new(DuckDuckGoProvider::new()?));

    Ok(Arc::new(SentimentService::new(
        ProviderChain::new(sources),
        SentimentRepository::new(db.pool().clone()),
    )))
}

fn agents(config: &AppConfig) -> Option<AgentPair> {
    let Some(api_key) = &config.llm.api_key else {
        tracing::warn!("no LLM API key, agents disabled; deterministic signals execute directly");
        return None;
    };
    let transport = Arc::new(OpenRouterTransport::new(&config.llm.api_url, api_key));
    Some(AgentPair {
        advisor: Advisor::new(
            transport.clone(),
            config.llm.primary_model.clone(),
            config.llm.fallback_model.clone(),
            Duration::from_secs(config.llm.advisor_timeout_secs),
        ),
        consultant: Consultant::new(
            transport,
            config.llm.consultant_model.clone(),
            Duration::from_secs(config.llm.consultant_timeout_secs),
        ),
    })
}

pub fn runner(db: DatabaseClient, config: AppConfig) -> Result<CycleRunner> {
    let exchange = exchange(&config)?;
    let sentiment = sentiment(&db, &config)?;
    let agents = agents(&config);
    CycleRunner::new(db, config, exchange, sentiment, agents)
}
