use super::ui;
use crate::core::config::AppConfig;
use crate::core::snapshot::SnapshotStore;
use crate::ingest::{FeedIngestor, IngestReport};
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;

/// Imports the feed at `url` for `[from, to]` and prints the counts.
pub async fn run(
    config: &AppConfig,
    store: Arc<dyn SnapshotStore>,
    from: NaiveDate,
    to: NaiveDate,
    url: &str,
) -> Result<IngestReport> {
    let ingestor = FeedIngestor::from_config(config, store)?;

    println!(
        "Downloading {} rates from: {}",
        config.source,
        ui::style_text(url, ui::StyleType::Subtle)
    );
    let pb = ui::new_spinner("Importing rates");
    let result = ingestor.ingest(url, from, to).await;
    pb.finish_and_clear();

    let report = result?;
    println!(
        "{} {}",
        ui::style_text("Done!", ui::StyleType::TotalValue),
        report
    );
    Ok(report)
}
