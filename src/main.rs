mod config;
mod db;
mod error;
mod export;
mod extract;
mod fetch;
mod pipeline;
mod progress;
mod table;
mod transform;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::fetch::HtmlSource;
use crate::progress::ProgressLog;

#[derive(Parser)]
#[command(name = "gdp_etl", about = "Country GDP table: extract, clean, load to CSV and SQLite")]
struct Cli {
    /// TOML settings file (default: gdp_etl.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline and the >= threshold query (default)
    Run {
        /// Read the page from a saved HTML file instead of fetching it
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Run a SQL statement against the loaded database
    Query {
        /// e.g. "SELECT * FROM Countries_by_GDP WHERE GDP_USD_billions >= 1000"
        sql: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command.unwrap_or(Commands::Run { html_file: None }) {
        Commands::Run { html_file } => {
            let source = match html_file {
                Some(path) => HtmlSource::File(path),
                None => HtmlSource::Url(settings.url.clone()),
            };
            let log = ProgressLog::new(&settings.log_path);
            info!("Progress log: {}", log.path().display());
            let summary = pipeline::run(&settings, &source, &log).await?;
            info!(
                extracted = summary.extracted,
                loaded = summary.loaded,
                matched = summary.matched,
                "Run finished"
            );
            println!(
                "\nLoaded {} of {} countries into {} ({}); {} at or above {} billion.",
                summary.loaded,
                summary.extracted,
                settings.table_name,
                settings.csv_path.display(),
                summary.matched,
                settings.query_min_billions,
            );
        }
        Commands::Query { sql } => {
            let mut store = db::Store::default();
            store
                .open(&settings.db_path)
                .with_context(|| format!("Failed to open {}", settings.db_path.display()))?;
            println!("{}", sql);
            let output = db::run_query(store.connection()?, &sql)?;
            println!("{}", output);
            store.close()?;
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
