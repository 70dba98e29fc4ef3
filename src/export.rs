use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::table::{CleanRow, Table};

/// Header row, then one record per country. No index column.
pub fn write_csv(path: &Path, table: &Table<CleanRow>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.columns)?;
    for r in &table.rows {
        let gdp = format!("{:.2}", r.gdp_usd_billions);
        wtr.write_record([r.country.as_str(), gdp.as_str()])?;
    }
    wtr.flush()?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
pub fn read_csv(path: &Path) -> Result<Table<CleanRow>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let columns = rdr.headers()?.iter().map(String::from).collect();

    let mut table = Table::new(columns);
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let gdp = record.get(1).unwrap_or_default().trim();
        let gdp_usd_billions = gdp.parse::<f64>().map_err(|_| {
            csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("bad GDP value {:?} on line {}", gdp, i + 2),
            ))
        })?;
        table.rows.push(CleanRow {
            country: record.get(0).unwrap_or_default().to_string(),
            gdp_usd_billions,
        });
    }
    Ok(table)
}
