/// Ordered rows plus their column names. Row order is source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    pub columns: Vec<String>,
    pub rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Country and GDP cell text exactly as scraped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub country: String,
    pub gdp_raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub country: String,
    pub gdp_usd_billions: f64,
}
