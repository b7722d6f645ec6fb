use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/papertrade".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub api_url: String,
    pub rate_limit_per_second: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.binance.com".to_string(),
            rate_limit_per_second: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Symbol universe, exchange notation (e.g. "BTC/USD").
    pub symbols: Vec<String>,
    /// Primary candle timeframe.
    pub timeframe: String,
    /// Seconds between cycle starts.
    pub cycle_seconds: u64,
    /// Fraction of the cycle interval a symbol pipeline may run before
    /// it is abandoned for this cycle.
    pub deadline_fraction: f64,
    /// Bars fetched per cycle; must cover 3x the longest indicator lookback.
    pub fetch_limit: usize,
    /// Days of history loaded by `init` before the first cycle.
    pub warmup_days: i64,
    /// Whether short entries are evaluated at all.
    pub enable_shorts: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC/USD".to_string(), "ETH/USD".to_string()],
            timeframe: "5m".to_string(),
            cycle_seconds: 90,
            deadline_fraction: 0.8,
            fetch_limit: 650,
            warmup_days: 120,
            enable_shorts: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of NAV risked per trade (entry-to-stop distance).
    pub risk_per_trade: f64,
    /// Cap on notional per symbol as a fraction of NAV.
    pub max_exposure_per_symbol: f64,
    /// Initial and trailing stop distance in ATR multiples.
    pub atr_stop_multiplier: f64,
    /// Relative-volume floor for entries.
    pub rvol_threshold: f64,
    /// Bars with no new entry after a stop-out.
    pub cooldown_bars: i64,
    /// Bars without a new extreme before the time stop fires.
    pub time_stop_bars: i64,
    #[serde(default)]
    pub kill_switch: KillSwitchConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.005,
            max_exposure_per_symbol: 0.02,
            atr_stop_multiplier: 2.0,
            rvol_threshold: 1.5,
            cooldown_bars: 3,
            time_stop_bars: 40,
            kill_switch: KillSwitchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    /// Bars in the realized-volatility window.
    pub vol_window_bars: usize,
    /// Days of history behind the median baseline.
    pub baseline_days: i64,
    /// Trigger when sigma exceeds this multiple of the baseline median.
    pub sigma_multiplier: f64,
    /// Bars the per-symbol block stays active once triggered.
    pub block_bars: i64,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            vol_window_bars: 12,
            baseline_days: 30,
            sigma_multiplier: 3.0,
            block_bars: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenRouter API key; absent key disables both agents and the
    /// deterministic signal executes directly.
    pub api_key: Option<String>,
    pub api_url: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub consultant_model: String,
    pub advisor_timeout_secs: u64,
    pub consultant_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            primary_model: "deepseek/deepseek-chat-v3-0324".to_string(),
            fallback_model: "x-ai/grok-beta".to_string(),
            consultant_model: "x-ai/grok-4-fast".to_string(),
            advisor_timeout_secs: 30,
            consultant_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Search-provider API key; absent key skips straight to the fallback
    /// search backend.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.perplexity.ai/chat/completions".to_string(),
            model: "llama-3.1-sonar-small-128k-online".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            exchange: ExchangeConfig::default(),
            trading: TradingConfig::default(),
            risk: RiskConfig::default(),
            llm: LlmConfig::default(),
            sentiment: SentimentConfig::default(),
        }
    }
}
