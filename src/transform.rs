use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::table::{CleanRow, RawRow, Table};

pub const BILLIONS_COLUMN: &str = "GDP_USD_billions";

// An unclosed marker ("25,678[5") runs to the end of the text.
static FOOTNOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*(?:\]|$)").unwrap());
static NON_NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.]").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Nothing numeric left after cleaning.
    NoDigits,
    /// Cleaned text still isn't a number, e.g. "1.2.3".
    Malformed(String),
    NotFinite,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoDigits => write!(f, "no digits"),
            SkipReason::Malformed(s) => write!(f, "malformed number {:?}", s),
            SkipReason::NotFinite => write!(f, "not finite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Clean(CleanRow),
    Skipped { country: String, reason: SkipReason },
}

/// Convert every row to billions, keeping only the ones that parse.
pub fn transform(raw: Table<RawRow>) -> Table<CleanRow> {
    let country_col = raw
        .columns
        .into_iter()
        .next()
        .unwrap_or_else(|| "Country".to_string());
    let mut out = Table::new(vec![country_col, BILLIONS_COLUMN.to_string()]);

    let total = raw.rows.len();
    for row in raw.rows {
        match convert_row(row) {
            RowOutcome::Clean(clean) => out.rows.push(clean),
            RowOutcome::Skipped { country, reason } => {
                debug!("Dropping {}: {}", country, reason);
            }
        }
    }

    info!("Transformed {} of {} rows", out.len(), total);
    out
}

pub fn convert_row(row: RawRow) -> RowOutcome {
    match millions_to_billions(&row.gdp_raw) {
        Ok(gdp_usd_billions) => RowOutcome::Clean(CleanRow {
            country: row.country,
            gdp_usd_billions,
        }),
        Err(reason) => RowOutcome::Skipped {
            country: row.country,
            reason,
        },
    }
}

/// Footnote markers like `[5]` or `[n 1]` are removed first so their digits
/// don't leak into the figure, then anything but ASCII digits and `.` is
/// stripped.
pub fn clean_numeric(text: &str) -> String {
    let without_notes = FOOTNOTE_RE.replace_all(text, "");
    NON_NUMERIC_RE.replace_all(&without_notes, "").into_owned()
}

/// Millions text → billions, rounded half away from zero to 2 decimals.
pub fn millions_to_billions(text: &str) -> Result<f64, SkipReason> {
    let cleaned = clean_numeric(text);
    if cleaned.is_empty() {
        return Err(SkipReason::NoDigits);
    }
    let millions: f64 = cleaned
        .parse()
        .map_err(|_| SkipReason::Malformed(cleaned.clone()))?;
    if !millions.is_finite() {
        return Err(SkipReason::NotFinite);
    }
    Ok(hundredths_of_billion(millions))
}

/// Billions × 100 is millions / 10, which is an exact tie for whole-million
/// inputs, so `.round()` sees the real half.
fn hundredths_of_billion(millions: f64) -> f64 {
    (millions / 10.0).round() / 100.0
}
