use std::fmt;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{EtlError, Result};
use crate::table::{CleanRow, Table};

// ── Connection ──

/// Owns the database connection for the length of a run.
///
/// Starts empty; `close` releases whatever is open and does nothing when the
/// run failed before a connection was made. Dropping the store closes too.
#[derive(Default)]
pub struct Store {
    conn: Option<Connection>,
}

impl Store {
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let conn = Connection::open(path)?;
        info!("Opened database {}", path.display());
        self.conn = Some(conn);
        Ok(())
    }

    pub fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(EtlError::NotConnected)
    }

    pub fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close database: {}", e);
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ── Loading ──

/// Replace `name` with the contents of `table`. Returns rows inserted.
pub fn load_table(conn: &Connection, name: &str, table: &Table<CleanRow>) -> Result<usize> {
    let t = quote_ident(name);
    let country = quote_ident(table.columns.first().map_or("Country", String::as_str));
    let gdp = quote_ident(table.columns.get(1).map_or("GDP_USD_billions", String::as_str));

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {t};
         CREATE TABLE {t} ({country} TEXT, {gdp} REAL);"
    ))?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&format!("INSERT INTO {t} ({country}, {gdp}) VALUES (?1, ?2)"))?;
        for r in &table.rows {
            count += stmt.execute(rusqlite::params![r.country, r.gdp_usd_billions])?;
        }
    }
    tx.commit()?;
    info!("Loaded {} rows into {}", count, name);
    Ok(count)
}

// ── Querying ──

pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Rows of `table` whose `column` is at least `min`.
pub fn threshold_query(table: &str, column: &str, min: f64) -> String {
    format!(
        "SELECT * FROM {} WHERE {} >= {}",
        quote_ident(table),
        quote_ident(column),
        min
    )
}

/// Run arbitrary SQL and collect every row.
pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryOutput> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(QueryOutput { columns, rows })
}

fn render(v: &Value) -> String {
    match v {
        Value::Null => "NULL".into(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => format!("{:.2}", f),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(render).collect())
            .collect();

        let idx_width = self.rows.len().to_string().len().max(1);
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        write!(f, "{:>idx_width$}", "")?;
        for (c, &w) in self.columns.iter().zip(&widths) {
            write!(f, " | {:<w$}", c)?;
        }
        writeln!(f)?;
        let rule = idx_width + widths.iter().map(|w| w + 3).sum::<usize>();
        writeln!(f, "{}", "-".repeat(rule))?;

        for (i, row) in cells.iter().enumerate() {
            write!(f, "{:>idx_width$}", i)?;
            for (cell, &w) in row.iter().zip(&widths) {
                write!(f, " | {:<w$}", cell)?;
            }
            writeln!(f)?;
        }
        write!(f, "({} rows)", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gdp_table(rows: &[(&str, f64)]) -> Table<CleanRow> {
        let mut t = Table::new(vec!["Country".into(), "GDP_USD_billions".into()]);
        t.rows = rows
            .iter()
            .map(|(c, g)| CleanRow {
                country: c.to_string(),
                gdp_usd_billions: *g,
            })
            .collect();
        t
    }

    fn countries(out: &QueryOutput) -> Vec<String> {
        out.rows
            .iter()
            .map(|r| match &r[0] {
                Value::Text(s) => s.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn threshold_filter_is_inclusive() {
        let conn = Connection::open_in_memory().unwrap();
        let table = gdp_table(&[("A", 150.0), ("B", 99.9), ("C", 100.0)]);
        load_table(&conn, "Countries_by_GDP", &table).unwrap();

        let sql = threshold_query("Countries_by_GDP", "GDP_USD_billions", 100.0);
        let out = run_query(&conn, &sql).unwrap();
        assert_eq!(out.columns, vec!["Country", "GDP_USD_billions"]);
        assert_eq!(countries(&out), vec!["A", "C"]);
    }

    #[test]
    fn load_replaces_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        load_table(&conn, "gdp", &gdp_table(&[("Old", 1.0), ("Older", 2.0)])).unwrap();
        let n = load_table(&conn, "gdp", &gdp_table(&[("New", 3.0)])).unwrap();
        assert_eq!(n, 1);

        let out = run_query(&conn, "SELECT * FROM gdp").unwrap();
        assert_eq!(countries(&out), vec!["New"]);
        assert_eq!(out.rows[0][1], Value::Real(3.0));
    }

    #[test]
    fn malformed_query_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            run_query(&conn, "SELEC nonsense"),
            Err(EtlError::Sqlite(_))
        ));
    }

    #[test]
    fn closing_unopened_store_is_noop() {
        let mut store = Store::default();
        assert!(matches!(store.connection(), Err(EtlError::NotConnected)));
        store.close().unwrap();
        store.close().unwrap();
    }

    #[test]
    fn store_open_then_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::default();
        store.open(&dir.path().join("w.db")).unwrap();
        store.connection().unwrap().execute_batch("CREATE TABLE t (x)").unwrap();
        store.close().unwrap();
        assert!(store.connection().is_err());
    }

    #[test]
    fn output_renders_as_table() {
        let conn = Connection::open_in_memory().unwrap();
        load_table(&conn, "gdp", &gdp_table(&[("Japan", 4409.74)])).unwrap();
        let text = run_query(&conn, "SELECT * FROM gdp").unwrap().to_string();
        assert!(text.contains("Country"));
        assert!(text.contains("Japan"));
        assert!(text.contains("4409.74"));
        assert!(text.ends_with("(1 rows)"));
    }
}
