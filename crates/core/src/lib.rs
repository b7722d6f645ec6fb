pub mod config;
pub mod config_loader;
pub mod events;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, DatabaseConfig, ExchangeConfig, KillSwitchConfig, LlmConfig, RiskConfig,
    SentimentConfig, TradingConfig,
};
pub use config_loader::ConfigLoader;
pub use events::{EventAction, EventLevel, EventRecord, EventTag};
pub use traits::{ExchangeAdapter, LlmTransport, SentimentSource, TransportError};
pub use types::{Candle, ExitReason, Regime, SentimentSnapshot, Side, Timeframe};
