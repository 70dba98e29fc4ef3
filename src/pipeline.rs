use tracing::{info, warn};

use crate::config::Settings;
use crate::db::{self, Store};
use crate::error::Result;
use crate::export;
use crate::extract;
use crate::fetch::HtmlSource;
use crate::progress::ProgressLog;
use crate::transform::{self, BILLIONS_COLUMN};

/// Row counts from a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub extracted: usize,
    pub loaded: usize,
    pub matched: usize,
}

/// Fetch → extract → transform → CSV + database → threshold query.
///
/// Any stage error is written to the progress log as `ERROR: ...` and
/// returned. The database connection is released on every path.
pub async fn run(settings: &Settings, source: &HtmlSource, log: &ProgressLog) -> Result<RunSummary> {
    let mut store = Store::default();
    let outcome = run_stages(settings, source, log, &mut store).await;
    if let Err(e) = &outcome {
        log.error(e);
    }

    let closed = store.close();
    let summary = outcome?;
    if let Err(e) = &closed {
        log.error(e);
    }
    closed?;
    Ok(summary)
}

async fn run_stages(
    settings: &Settings,
    source: &HtmlSource,
    log: &ProgressLog,
    store: &mut Store,
) -> Result<RunSummary> {
    log.log("Preliminaries complete. Initiating ETL process.");

    let html = source.fetch().await?;
    let raw = extract::extract(&html, settings)?;
    let extracted = raw.len();
    log.log("Data extraction complete. Initiating transformation process.");

    let clean = transform::transform(raw);
    if clean.is_empty() {
        warn!("No rows survived transformation");
    }
    log.log("Data transformation complete. Initiating loading process.");

    export::write_csv(&settings.csv_path, &clean)?;
    log.log("Data saved to CSV file.");

    store.open(&settings.db_path)?;
    log.log("SQL connection initiated.");

    let conn = store.connection()?;
    let loaded = db::load_table(conn, &settings.table_name, &clean)?;
    log.log("Data loaded to database as table. Running the query.");

    let sql = db::threshold_query(&settings.table_name, BILLIONS_COLUMN, settings.query_min_billions);
    println!("{}", sql);
    let output = db::run_query(conn, &sql)?;
    println!("{}", output);
    info!("{} rows at or above {} billion", output.rows.len(), settings.query_min_billions);

    log.log("Process complete.");
    Ok(RunSummary {
        extracted,
        loaded,
        matched: output.rows.len(),
    })
}
