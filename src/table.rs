use crate::scan::models::ScanResult;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use std::collections::BTreeMap;

/// Paths listed per status before the row is truncated.
const MAX_EXAMPLES: usize = 3;

pub struct TableBuilder {
    table: Table,
}

impl TableBuilder {
    pub fn new() -> Self {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic);

        Self { table }
    }

    /// One row per status code: count and a few example paths.
    pub fn status_summary(results: &[ScanResult]) -> String {
        let mut builder = Self::new();

        builder.table.set_header(vec![
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
            Cell::new("Paths").add_attribute(Attribute::Bold),
        ]);

        let mut by_status: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
        for result in results {
            by_status.entry(result.status).or_default().push(result.path.as_str());
        }

        for (status, paths) in &by_status {
            let mut shown = paths.iter().take(MAX_EXAMPLES).copied().collect::<Vec<_>>().join(", ");
            if paths.len() > MAX_EXAMPLES {
                shown.push_str(&format!(", ... ({} more)", paths.len() - MAX_EXAMPLES));
            }
            builder.table.add_row(vec![
                Cell::new(status.to_string()).fg(status_color(*status)),
                Cell::new(paths.len().to_string()),
                Cell::new(shown),
            ]);
        }

        builder.table.to_string()
    }
}

fn status_color(status: u16) -> Color {
    match status {
        200..=299 => Color::Green,
        300..=399 => Color::Yellow,
        400..=499 => Color::Magenta,
        _ => Color::Red,
    }
}
