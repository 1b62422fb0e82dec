//! Core domain types and abstractions

pub mod config;
pub mod currency;
pub mod log;
pub mod snapshot;

// Re-export main types for cleaner imports
pub use currency::{CurrencySet, SourceEntry, SourceRegistry};
pub use snapshot::{ExchangeSnapshot, SnapshotStore, StoreError};
