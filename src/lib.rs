pub mod cli;
pub mod core;
pub mod ingest;
pub mod providers;
pub mod resolve;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

/// Earliest date imported when `fetch` is given no start date.
pub const DEFAULT_FROM_DATE: &str = "2023-01-01";

pub enum AppCommand {
    Fetch {
        from: NaiveDate,
        to: Option<NaiveDate>,
        url: Option<String>,
    },
    Rate {
        currency: String,
        date: Option<NaiveDate>,
        source: Option<String>,
    },
    Rates {
        date: Option<NaiveDate>,
        source: Option<String>,
    },
    Sources,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxsnap starting...");
    let config = load_config(config_path)?;

    match command {
        AppCommand::Fetch { from, to, url } => {
            let to = to.unwrap_or_else(|| Local::now().date_naive());
            let url = url.as_deref().unwrap_or(&config.feed.url);
            let store = store::open_store(&config)?;
            cli::fetch::run(&config, store, from, to, url).await?;
        }
        AppCommand::Rate {
            currency,
            date,
            source,
        } => {
            let store = store::open_store(&config)?;
            let resolver = resolve::RateResolver::from_config(&config, store);
            let source = source.as_deref().unwrap_or(&config.source);
            cli::rate::run_rate(&resolver, &currency, date, source).await?;
        }
        AppCommand::Rates { date, source } => {
            let store = store::open_store(&config)?;
            let resolver = resolve::RateResolver::from_config(&config, store);
            let source = source.as_deref().unwrap_or(&config.source);
            cli::rate::run_rates(&resolver, date, source).await?;
        }
        AppCommand::Sources => cli::sources::run(&config),
    }

    Ok(())
}
