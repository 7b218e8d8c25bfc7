// Engine settings, loaded from an optional JSON file and overridden by environment variables
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineError;

pub const CONFIG_PATH_ENV: &str = "ENGINE_CONFIG";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const NETWORK_ENV: &str = "ENGINE_NETWORK";
pub const SYMBOL_ENV: &str = "ENGINE_SYMBOL";
pub const CSV_PATH_ENV: &str = "ENGINE_CSV_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn nearblocks_base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.nearblocks.io",
            Network::Testnet => "https://api-testnet.nearblocks.io",
        }
    }

    pub fn parse(value: &str) -> Result<Self, EngineError> {
        match value.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(EngineError::ConfigError(format!(
                "Unknown network '{}'. Use 'mainnet' or 'testnet'.",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    pub asset: AssetSettings,
    pub network: Network,
    pub providers: ProviderSettings,
    pub narrative: NarrativeSettings,
    pub anomaly: AnomalySettings,
    pub regression: RegressionSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssetSettings {
    pub symbol: String,
    // Benchmark used for the market sensitivity (beta) regression.
    pub market_symbol: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
    pub yahoo_base_url: String,
    // Overrides the network's default explorer endpoint when set.
    pub nearblocks_base_url: Option<String>,
    pub csv_path: Option<String>,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NarrativeSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub findings_max_tokens: u32,
    pub anomaly_max_tokens: u32,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnomalySettings {
    pub max_samples: usize,
    pub seed: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegressionSettings {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            asset: AssetSettings::default(),
            network: Network::Mainnet,
            providers: ProviderSettings::default(),
            narrative: NarrativeSettings::default(),
            anomaly: AnomalySettings::default(),
            regression: RegressionSettings::default(),
        }
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        AssetSettings {
            symbol: "NEAR-USD".to_string(),
            market_symbol: "BTC-USD".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            nearblocks_base_url: None,
            csv_path: None,
            cache_ttl_secs: 300,
            request_timeout_secs: 30,
        }
    }
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        NarrativeSettings {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            temperature: 0.5,
            findings_max_tokens: 600,
            anomaly_max_tokens: 800,
            api_key: None,
        }
    }
}

impl Default for AnomalySettings {
    fn default() -> Self {
        AnomalySettings {
            max_samples: 256,
            seed: 42,
        }
    }
}

impl Default for RegressionSettings {
    fn default() -> Self {
        RegressionSettings {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl EngineSettings {
    /// Reads `path` when given (missing sections fall back to defaults), then validates.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let settings = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    EngineError::ConfigError(format!("Failed to read config file '{}': {}", p.display(), e))
                })?;
                serde_json::from_str::<EngineSettings>(&raw).map_err(|e| {
                    EngineError::ConfigError(format!("Invalid config file '{}': {}", p.display(), e))
                })?
            }
            None => EngineSettings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    // File named by ENGINE_CONFIG (if any) plus process environment overrides.
    pub fn from_env() -> Result<Self, EngineError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        let mut settings = Self::load(path.as_deref().map(Path::new))?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.narrative.api_key = Some(key);
        }
        if let Some(network) = lookup(NETWORK_ENV) {
            self.network = Network::parse(&network)?;
        }
        if let Some(symbol) = lookup(SYMBOL_ENV).filter(|s| !s.trim().is_empty()) {
            self.asset.symbol = symbol.trim().to_string();
        }
        if let Some(path) = lookup(CSV_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.providers.csv_path = Some(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.asset.symbol.trim().is_empty() {
            return Err(EngineError::ConfigError("asset.symbol must not be empty".to_string()));
        }
        if self.anomaly.max_samples < 2 {
            return Err(EngineError::ConfigError("anomaly.max_samples must be at least 2".to_string()));
        }
        if !(self.regression.test_fraction > 0.0 && self.regression.test_fraction < 1.0) {
            return Err(EngineError::ConfigError(format!(
                "regression.test_fraction must be in (0, 1), got {}",
                self.regression.test_fraction
            )));
        }
        Ok(())
    }

    pub fn nearblocks_base_url(&self) -> String {
        self.providers
            .nearblocks_base_url
            .clone()
            .unwrap_or_else(|| self.network.nearblocks_base_url().to_string())
    }
}
