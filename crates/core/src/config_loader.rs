use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging the TOML file with
    /// `PAPERTRADE_`-prefixed environment variables, then overlays the
    /// conventional bare environment keys consumed at boot.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads configuration from an explicit TOML path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let mut config: AppConfig = Figment::from(figment::providers::Serialized::defaults(
            AppConfig::default(),
        ))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PAPERTRADE_").split("__"))
        .extract()?;

        // Bare keys win over file values so deployments can inject secrets
        // without touching the config file.
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("PERPLEXITY_API_KEY") {
            config.sentiment.api_key = Some(key);
        }

        Ok(config)
    }
}
