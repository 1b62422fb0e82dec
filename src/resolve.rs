//! Point-in-time lookups against the snapshot store.

use crate::core::config::AppConfig;
use crate::core::currency::SourceRegistry;
use crate::core::snapshot::{ExchangeSnapshot, SnapshotStore, StoreError, normalize_code};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("FX source '{0}' is not supported")]
    UnsupportedSource(String),

    #[error("No exchange rate snapshot for source '{provider}' {}", describe_as_of(.as_of))]
    NoSnapshot {
        provider: String,
        as_of: Option<NaiveDate>,
    },

    #[error("Currency {currency} not found in the {provider} snapshot of {date}")]
    CurrencyNotFound {
        currency: String,
        provider: String,
        date: NaiveDate,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn describe_as_of(as_of: &Option<NaiveDate>) -> String {
    match as_of {
        Some(date) => format!("on or before {date}"),
        None => "at all".to_string(),
    }
}

pub struct RateResolver {
    sources: SourceRegistry,
    store: Arc<dyn SnapshotStore>,
}

impl RateResolver {
    pub fn new(sources: SourceRegistry, store: Arc<dyn SnapshotStore>) -> Self {
        Self { sources, store }
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn SnapshotStore>) -> Self {
        Self::new(config.source_registry(), store)
    }

    /// Selects the snapshot a query for `as_of` should read.
    ///
    /// With a date, this is the newest snapshot of `source` not after it. Without
    /// one it is the newest snapshot of any source, so `source` is only checked
    /// against the registry.
    pub async fn snapshot(
        &self,
        as_of: Option<NaiveDate>,
        source: &str,
    ) -> Result<ExchangeSnapshot, ResolveError> {
        if !self.sources.is_supported(source) {
            return Err(ResolveError::UnsupportedSource(source.to_string()));
        }

        let found = match as_of {
            Some(date) => self.store.latest_at_or_before(date, source).await?,
            None => self.store.latest().await?,
        };
        let snapshot = found.ok_or_else(|| ResolveError::NoSnapshot {
            provider: source.to_string(),
            as_of,
        })?;
        debug!(
            validity_date = %snapshot.validity_date,
            source = %snapshot.source,
            "Selected snapshot"
        );
        Ok(snapshot)
    }

    /// Rate of `currency` against the fixed base currency, exactly as stored.
    #[instrument(name = "ResolveRate", skip(self))]
    pub async fn resolve(
        &self,
        currency: &str,
        as_of: Option<NaiveDate>,
        source: &str,
    ) -> Result<Decimal, ResolveError> {
        let snapshot = self.snapshot(as_of, source).await?;
        let code = normalize_code(currency);
        snapshot
            .rates
            .get(&code)
            .copied()
            .ok_or(ResolveError::CurrencyNotFound {
                currency: code,
                provider: snapshot.source,
                date: snapshot.validity_date,
            })
    }
}
