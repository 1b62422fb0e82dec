//! Fetches a historical rates feed and merges it into the snapshot store.

use crate::core::config::AppConfig;
use crate::core::currency::CurrencySet;
use crate::core::snapshot::{ExchangeSnapshot, SnapshotStore, StoreError};
use crate::providers::ecb::{FeedParseError, parse_feed};
use anyhow::Result;
use chrono::NaiveDate;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to fetch rates feed from {url}: {cause}")]
    Fetch {
        url: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("Failed to parse rates feed: {0}")]
    Parse(#[from] FeedParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub created: usize,
    pub updated: usize,
}

impl Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported range {} -> {}. Snapshots created: {}, updated: {}.",
            self.from, self.to, self.created, self.updated
        )
    }
}

pub struct FeedIngestor {
    client: reqwest::Client,
    source: String,
    currencies: CurrencySet,
    store: Arc<dyn SnapshotStore>,
}

impl FeedIngestor {
    pub fn new(
        source: &str,
        currencies: CurrencySet,
        store: Arc<dyn SnapshotStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxsnap/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            source: source.to_string(),
            currencies,
            store,
        })
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        Self::new(
            &config.source,
            config.currency_set(),
            store,
            Duration::from_secs(config.feed.timeout_secs),
        )
    }

    /// Fetches `url` once and upserts one snapshot per date in `[from, to]`.
    ///
    /// The whole document is parsed before anything is written, so fetch and
    /// parse failures leave the store untouched. A store failure part way
    /// through keeps the snapshots already written.
    #[instrument(name = "FeedIngest", skip(self), fields(source = %self.source))]
    pub async fn ingest(
        &self,
        url: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<IngestReport, IngestError> {
        let document = self.fetch(url).await?;
        let parsed = parse_feed(&document, &(from..=to), &self.currencies)?;
        debug!(
            groups = parsed.groups_seen,
            in_range = parsed.rates.len(),
            "Parsed rates feed"
        );
        if parsed.groups_seen == 0 {
            warn!("Rates feed at {} contained no date groups", url);
        }

        let mut report = IngestReport {
            from,
            to,
            created: 0,
            updated: 0,
        };

        // BTreeMap iteration is ascending by date
        for (validity_date, rates) in parsed.rates {
            let snapshot = ExchangeSnapshot::new(validity_date, self.source.as_str(), rates);
            if self.store.upsert(snapshot).await? {
                report.created += 1;
            } else {
                report.updated += 1;
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            "Rates feed imported"
        );
        Ok(report)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError> {
        debug!("Requesting rates feed from {}", url);
        let fetch_error = |cause| IngestError::Fetch {
            url: url.to_string(),
            cause,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?;
        let body = response.bytes().await.map_err(fetch_error)?;
        debug!(bytes = body.len(), "Received rates feed");
        Ok(body.to_vec())
    }
}
