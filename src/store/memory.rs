use crate::core::snapshot::{ExchangeSnapshot, SnapshotStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

type SnapshotKey = (String, NaiveDate);

/// In-memory snapshot store ordered by source, then date.
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<BTreeMap<SnapshotKey, ExchangeSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// All snapshots ordered by source, then date.
    pub async fn all(&self) -> Vec<ExchangeSnapshot> {
        self.inner.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert(&self, snapshot: ExchangeSnapshot) -> Result<bool, StoreError> {
        let key = (snapshot.source.clone(), snapshot.validity_date);
        let mut map = self.inner.write().await;
        let created = map.insert(key, snapshot).is_none();
        debug!(created, "Memory store UPSERT");
        Ok(created)
    }

    async fn get(
        &self,
        date: NaiveDate,
        source: &str,
    ) -> Result<Option<ExchangeSnapshot>, StoreError> {
        let map = self.inner.read().await;
        Ok(map.get(&(source.to_string(), date)).cloned())
    }

    async fn latest(&self) -> Result<Option<ExchangeSnapshot>, StoreError> {
        let map = self.inner.read().await;
        Ok(map
            .values()
            .max_by(|a, b| {
                a.validity_date
                    .cmp(&b.validity_date)
                    .then_with(|| b.source.cmp(&a.source))
            })
            .cloned())
    }

    async fn latest_at_or_before(
        &self,
        date: NaiveDate,
        source: &str,
    ) -> Result<Option<ExchangeSnapshot>, StoreError> {
        let map = self.inner.read().await;
        let lower = (source.to_string(), NaiveDate::MIN);
        let upper = (source.to_string(), date);
        Ok(map
            .range(lower..=upper)
            .next_back()
            .map(|(_, snapshot)| snapshot.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(d: NaiveDate, source: &str, usd: i64) -> ExchangeSnapshot {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), Decimal::new(usd, 4));
        ExchangeSnapshot::new(d, source, rates)
    }

    #[tokio::test]
    async fn test_upsert_creates_then_replaces() {
        let store = MemorySnapshotStore::new();

        assert!(store.upsert(snapshot(date(2023, 1, 2), "ECB", 10660)).await.unwrap());
        assert!(!store.upsert(snapshot(date(2023, 1, 2), "ECB", 10665)).await.unwrap());
        assert_eq!(store.len().await, 1);

        let stored = store.get(date(2023, 1, 2), "ECB").await.unwrap().unwrap();
        assert_eq!(stored.rate("USD"), Some(Decimal::new(10665, 4)));
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_rate_map() {
        let store = MemorySnapshotStore::new();
        let mut first = snapshot(date(2023, 1, 2), "ECB", 10660);
        first.rates.insert("GBP".to_string(), Decimal::new(8800, 4));
        store.upsert(first).await.unwrap();
        store.upsert(snapshot(date(2023, 1, 2), "ECB", 10665)).await.unwrap();

        let stored = store.get(date(2023, 1, 2), "ECB").await.unwrap().unwrap();
        assert_eq!(stored.rates.len(), 1);
        assert!(stored.rate("GBP").is_none());
    }

    #[tokio::test]
    async fn test_same_date_different_sources_coexist() {
        let store = MemorySnapshotStore::new();
        assert!(store.upsert(snapshot(date(2023, 1, 2), "ECB", 1)).await.unwrap());
        assert!(store.upsert(snapshot(date(2023, 1, 2), "FED", 2)).await.unwrap());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_latest_at_or_before_filters_by_source() {
        let store = MemorySnapshotStore::new();
        store.upsert(snapshot(date(2023, 1, 2), "ECB", 1)).await.unwrap();
        store.upsert(snapshot(date(2023, 1, 5), "ECB", 2)).await.unwrap();
        store.upsert(snapshot(date(2023, 1, 4), "FED", 3)).await.unwrap();

        let found = store
            .latest_at_or_before(date(2023, 1, 4), "ECB")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.validity_date, date(2023, 1, 2));

        let exact = store
            .latest_at_or_before(date(2023, 1, 5), "ECB")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exact.validity_date, date(2023, 1, 5));

        assert!(
            store
                .latest_at_or_before(date(2023, 1, 1), "ECB")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .latest_at_or_before(date(2023, 1, 3), "FED")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_latest_spans_all_sources() {
        let store = MemorySnapshotStore::new();
        assert!(store.latest().await.unwrap().is_none());

        store.upsert(snapshot(date(2023, 1, 2), "ECB", 1)).await.unwrap();
        store.upsert(snapshot(date(2023, 1, 6), "FED", 2)).await.unwrap();
        store.upsert(snapshot(date(2023, 1, 6), "BOE", 3)).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.validity_date, date(2023, 1, 6));
        assert_eq!(latest.source, "BOE");
    }
}
