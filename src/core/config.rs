use super::currency::{CurrencySet, SourceEntry, SourceRegistry};
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_FEED_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-hist.xml";
pub const DEFAULT_SOURCE: &str = "ECB";
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Currencies quoted in the ECB euro foreign exchange reference rates.
const ECB_CURRENCIES: &[&str] = &[
    "USD", "JPY", "BGN", "CZK", "DKK", "GBP", "HUF", "PLN", "RON", "SEK", "CHF", "ISK", "NOK",
    "TRY", "AUD", "BRL", "CAD", "CNY", "HKD", "IDR", "ILS", "INR", "KRW", "MXN", "MYR", "NZD",
    "PHP", "SGD", "THB", "ZAR",
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Recognized currency codes; anything else in a feed is dropped.
    pub currencies: Vec<String>,
    pub sources: Vec<SourceEntry>,
    /// Identifier stamped on ingested snapshots and used for queries by default.
    pub source: String,
    pub feed: FeedConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currencies: ECB_CURRENCIES.iter().map(|c| c.to_string()).collect(),
            sources: vec![SourceEntry {
                name: "European Central Bank".to_string(),
                id: DEFAULT_SOURCE.to_string(),
            }],
            source: DEFAULT_SOURCE.to_string(),
            feed: FeedConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "fxsnap", "fxsnap")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "fxsnap", "fxsnap")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("snapshots"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        // An empty document deserializes to null, which is not a mapping
        let config: Self = if config_str.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&config_str).with_context(|| {
                format!("Failed to parse config file: {}", path.as_ref().display())
            })?
        };
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("Config must list at least one rate source");
        }
        if !self.sources.iter().any(|s| s.id == self.source) {
            bail!(
                "Configured source '{}' is not in the source registry",
                self.source
            );
        }
        Ok(())
    }

    pub fn currency_set(&self) -> CurrencySet {
        CurrencySet::new(&self.currencies)
    }

    pub fn source_registry(&self) -> SourceRegistry {
        SourceRegistry::new(self.sources.clone())
    }
}
