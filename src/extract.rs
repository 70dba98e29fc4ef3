use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{EtlError, Result};
use crate::table::{RawRow, Table};

static TBODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Pull (country, GDP text) pairs out of the GDP table on the page.
///
/// The table is found purely by position: the `tbody_index`-th `<tbody>` in
/// document order. Rows without `<td>` cells (headers) or without a link in
/// the first cell (the "World" aggregate, footers) are skipped, as are rows
/// whose GDP cell carries no digit at all.
pub fn extract(html: &str, settings: &Settings) -> Result<Table<RawRow>> {
    let document = Html::parse_document(html);
    let bodies: Vec<ElementRef> = document.select(&TBODY).collect();

    let body = bodies
        .get(settings.tbody_index)
        .ok_or(EtlError::TableNotFound {
            index: settings.tbody_index,
            found: bodies.len(),
        })?;

    let mut table = Table::new(settings.table_attribs.clone());
    for row in body.select(&TR) {
        if let Some(raw) = parse_row(row, settings.gdp_cell_index) {
            table.rows.push(raw);
        }
    }

    info!(
        "Extracted {} rows from tbody #{} ({} on page)",
        table.len(),
        settings.tbody_index,
        bodies.len()
    );
    Ok(table)
}

fn parse_row(row: ElementRef, gdp_cell_index: usize) -> Option<RawRow> {
    let cells: Vec<ElementRef> = row.select(&TD).collect();
    let first = cells.first()?;
    let link = first.select(&ANCHOR).next()?;

    let country = cell_text(link);
    let Some(gdp_cell) = cells.get(gdp_cell_index) else {
        debug!("Row for {} has no GDP cell", country);
        return None;
    };
    let gdp_raw = cell_text(*gdp_cell);

    if !gdp_raw.chars().any(|c| c.is_ascii_digit()) {
        debug!("Skipping {}: no figure in {:?}", country, gdp_raw);
        return None;
    }

    Some(RawRow { country, gdp_raw })
}

/// Each text node trimmed, then joined with no separator.
fn cell_text(el: ElementRef) -> String {
    el.text().map(str::trim).collect()
}
