//! Sentiment provider chain and the twice-daily refresh cache.
//!
//! The primary provider is an online-search completion API; when it is
//! unconfigured or failing, a DuckDuckGo instant-answer fallback takes
//! over, and a neutral snapshot is the last resort. Within a refresh
//! window (00:00 and 12:00 UTC) the cached value is always reused.

pub mod chain;
pub mod fallback;
pub mod provider;
pub mod service;

pub use chain::ProviderChain;
pub use fallback::DuckDuckGoProvider;
pub use provider::SearchSentimentProvider;
pub use service::{refresh_window_start, SentimentService};
