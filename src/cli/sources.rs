use super::ui;
use crate::core::config::AppConfig;
use comfy_table::Cell;

/// Prints the configured rate sources; the ingest source is marked.
pub fn run(config: &AppConfig) {
    println!("{}", sources_table(config));
}

fn sources_table(config: &AppConfig) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Source"),
        ui::header_cell("Identifier"),
        ui::header_cell("Default"),
    ]);

    for entry in config.source_registry().entries() {
        let marker = if entry.id == config.source { "*" } else { "" };
        table.add_row(vec![
            Cell::new(&entry.name),
            Cell::new(&entry.id),
            Cell::new(marker),
        ]);
    }

    table.to_string()
}
