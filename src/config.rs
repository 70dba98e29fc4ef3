use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_CONFIG_FILE: &str = "gdp_etl.toml";

const SNAPSHOT_URL: &str = "https://web.archive.org/web/20230902185326/https://en.wikipedia.org/wiki/List_of_countries_by_GDP_%28nominal%29";

/// Everything a run needs, built once in `main` and passed down by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub url: String,
    /// Column names of the extracted table: country, then raw GDP (millions).
    pub table_attribs: Vec<String>,
    /// Which `<tbody>` on the page holds the GDP table (zero-based).
    pub tbody_index: usize,
    /// Which `<td>` of a row holds the GDP figure (zero-based).
    pub gdp_cell_index: usize,
    pub db_path: PathBuf,
    pub table_name: String,
    pub csv_path: PathBuf,
    pub log_path: PathBuf,
    pub query_min_billions: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: SNAPSHOT_URL.to_string(),
            table_attribs: vec!["Country".into(), "GDP_USD_millions".into()],
            tbody_index: 2,
            gdp_cell_index: 2,
            db_path: PathBuf::from("World_Economies.db"),
            table_name: "Countries_by_GDP".into(),
            csv_path: PathBuf::from("Countries_by_GDP.csv"),
            log_path: PathBuf::from("etl_project_log.txt"),
            query_min_billions: 100.0,
        }
    }
}

impl Settings {
    /// Defaults, then the TOML file (explicit path or `gdp_etl.toml` if present),
    /// then `GDP_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(Environment::with_prefix("GDP").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// The threshold is formatted into SQL, so it must be a real number.
    pub fn validate(&self) -> Result<()> {
        if !self.query_min_billions.is_finite() {
            return Err(ConfigError::Message(format!(
                "query_min_billions must be finite, got {}",
                self.query_min_billions
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_snapshot_layout() {
        let s = Settings::default();
        assert_eq!(s.tbody_index, 2);
        assert_eq!(s.gdp_cell_index, 2);
        assert_eq!(s.table_attribs, vec!["Country", "GDP_USD_millions"]);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etl.toml");
        std::fs::write(
            &path,
            "table_name = \"Gdp\"\ntbody_index = 0\nquery_min_billions = 250.0\n",
        )
        .unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.table_name, "Gdp");
        assert_eq!(s.tbody_index, 0);
        assert_eq!(s.query_min_billions, 250.0);
        // untouched keys keep their defaults
        assert_eq!(s.gdp_cell_index, 2);
        assert_eq!(s.csv_path, PathBuf::from("Countries_by_GDP.csv"));
    }

    #[test]
    fn non_finite_threshold_is_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let s = Settings {
                query_min_billions: bad,
                ..Settings::default()
            };
            assert!(matches!(s.validate(), Err(crate::error::EtlError::Config(_))));
        }
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn infinite_threshold_in_file_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etl.toml");
        std::fs::write(&path, "query_min_billions = inf\n").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
