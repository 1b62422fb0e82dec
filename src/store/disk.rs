use crate::core::snapshot::{ExchangeSnapshot, SnapshotStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "snapshots";
const KEY_SEPARATOR: char = '\0';

/// Snapshot store persisted in a fjall keyspace.
///
/// Keys are `<source>\0<YYYY-MM-DD>`, so the snapshots of one source sort by
/// date and "latest at or before" is a reverse range scan.
pub struct DiskSnapshotStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskSnapshotStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;

        let keyspace = fjall::Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened snapshot store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

fn snapshot_key(date: NaiveDate, source: &str) -> String {
    format!("{source}{KEY_SEPARATOR}{}", date.format("%Y-%m-%d"))
}

fn parse_key(key: &[u8]) -> Result<(String, NaiveDate), StoreError> {
    let corrupt = || StoreError::CorruptKey(String::from_utf8_lossy(key).into_owned());
    let text = std::str::from_utf8(key).map_err(|_| corrupt())?;
    let (source, date) = text.split_once(KEY_SEPARATOR).ok_or_else(corrupt)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| corrupt())?;
    Ok((source.to_string(), date))
}

#[async_trait]
impl SnapshotStore for DiskSnapshotStore {
    async fn upsert(&self, snapshot: ExchangeSnapshot) -> Result<bool, StoreError> {
        let key = snapshot_key(snapshot.validity_date, &snapshot.source);
        let existed = self.partition.contains_key(key.as_str())?;
        self.partition
            .insert(key.as_str(), serde_json::to_vec(&snapshot)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        debug!(created = !existed, "Disk store UPSERT for key: {:?}", key);
        Ok(!existed)
    }

    async fn get(
        &self,
        date: NaiveDate,
        source: &str,
    ) -> Result<Option<ExchangeSnapshot>, StoreError> {
        match self.partition.get(snapshot_key(date, source))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn latest(&self) -> Result<Option<ExchangeSnapshot>, StoreError> {
        let mut best: Option<(NaiveDate, String)> = None;
        for item in self.partition.keys() {
            let key = item?;
            let (source, date) = parse_key(&key)?;
            let better = match &best {
                None => true,
                Some((best_date, best_source)) => {
                    date > *best_date || (date == *best_date && source < *best_source)
                }
            };
            if better {
                best = Some((date, source));
            }
        }

        match best {
            Some((date, source)) => self.get(date, &source).await,
            None => Ok(None),
        }
    }

    async fn latest_at_or_before(
        &self,
        date: NaiveDate,
        source: &str,
    ) -> Result<Option<ExchangeSnapshot>, StoreError> {
        let lower = format!("{source}{KEY_SEPARATOR}");
        let upper = snapshot_key(date, source);
        match self.partition.range(lower..=upper).next_back() {
            Some(item) => {
                let (_, value) = item?;
                Ok(Some(serde_json::from_slice(&value)?))
            }
            None => Ok(None),
        }
    }
}
