//! Exchange rate snapshots and the persistence contract they are stored through.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Rates for a single validity date as published by a single source.
///
/// With `fixed_base_currency` set, every rate reads as
/// `1 <base currency> = rate <quoted currency>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSnapshot {
    pub validity_date: NaiveDate,
    pub source: String,
    pub fixed_base_currency: bool,
    pub rates: BTreeMap<String, Decimal>,
}

impl ExchangeSnapshot {
    pub fn new(
        validity_date: NaiveDate,
        source: impl Into<String>,
        rates: BTreeMap<String, Decimal>,
    ) -> Self {
        Self {
            validity_date,
            source: source.into(),
            fixed_base_currency: true,
            rates,
        }
    }

    /// Looks up a rate by currency code, ignoring case and surrounding whitespace.
    pub fn rate(&self, currency: &str) -> Option<Decimal> {
        self.rates.get(&normalize_code(currency)).copied()
    }
}

/// Storage convention for currency codes: trimmed and uppercase.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot store engine error: {0}")]
    Engine(#[from] fjall::Error),

    #[error("failed to (de)serialize snapshot: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt snapshot key: {0}")]
    CorruptKey(String),
}

/// Create-or-replace storage for snapshots keyed by `(validity_date, source)`.
///
/// Every `upsert` is a single all-or-nothing write. Lookups ordered by date
/// return the first match walking backwards from the newest snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores `snapshot`, replacing any row with the same date and source.
    /// Returns `true` when a new row was created.
    async fn upsert(&self, snapshot: ExchangeSnapshot) -> Result<bool, StoreError>;

    async fn get(
        &self,
        date: NaiveDate,
        source: &str,
    ) -> Result<Option<ExchangeSnapshot>, StoreError>;

    /// Snapshot with the greatest validity date across all sources. Ties on
    /// the same date go to the lowest source identifier.
    async fn latest(&self) -> Result<Option<ExchangeSnapshot>, StoreError>;

    /// Snapshot for `source` with the greatest validity date not after `date`.
    async fn latest_at_or_before(
        &self,
        date: NaiveDate,
        source: &str,
    ) -> Result<Option<ExchangeSnapshot>, StoreError>;
}
