use super::ui;
use crate::core::snapshot::ExchangeSnapshot;
use crate::resolve::RateResolver;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

/// Prints the rate of `currency` for the selected snapshot.
pub async fn run_rate(
    resolver: &RateResolver,
    currency: &str,
    as_of: Option<NaiveDate>,
    source: &str,
) -> Result<()> {
    let rate = resolver.resolve(currency, as_of, source).await?;
    println!("{rate}");
    Ok(())
}

/// Prints every rate of the selected snapshot as a table.
pub async fn run_rates(
    resolver: &RateResolver,
    as_of: Option<NaiveDate>,
    source: &str,
) -> Result<()> {
    let snapshot = resolver.snapshot(as_of, source).await?;
    println!(
        "\n{}",
        ui::style_text(
            &format!("{} rates of {}", snapshot.source, snapshot.validity_date),
            ui::StyleType::Title
        )
    );
    println!("{}", snapshot_table(&snapshot));
    Ok(())
}

fn snapshot_table(snapshot: &ExchangeSnapshot) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);

    for (code, rate) in &snapshot.rates {
        table.add_row(vec![Cell::new(code), ui::number_cell(rate)]);
    }
    if snapshot.rates.is_empty() {
        table.add_row(vec![
            Cell::new(ui::style_text("No rates", ui::StyleType::Subtle)),
            Cell::new(""),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    #[test]
    fn test_snapshot_table_lists_rates_with_feed_digits() {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), Decimal::from_str("1.0660").unwrap());
        rates.insert("JPY".to_string(), Decimal::from_str("140.660").unwrap());
        let snapshot =
            ExchangeSnapshot::new(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(), "ECB", rates);

        let table = snapshot_table(&snapshot);
        assert!(table.contains("USD"));
        assert!(table.contains("1.0660"));
        assert!(table.contains("140.660"));
        assert!(table.find("JPY").unwrap() < table.find("USD").unwrap());
    }

    #[test]
    fn test_empty_snapshot_table() {
        let snapshot = ExchangeSnapshot::new(
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            "ECB",
            BTreeMap::new(),
        );
        assert!(snapshot_table(&snapshot).contains("No rates"));
    }
}
