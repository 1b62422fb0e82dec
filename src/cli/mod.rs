pub mod fetch;
pub mod rate;
pub mod setup;
pub mod sources;
pub mod ui;

use chrono::NaiveDate;

/// Parses a `YYYY-MM-DD` command line date.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{value}'. Use YYYY-MM-DD."))
}
