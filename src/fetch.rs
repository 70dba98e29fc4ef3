use std::path::PathBuf;

use tracing::info;

use crate::error::Result;

/// Where the page HTML comes from.
#[derive(Debug, Clone)]
pub enum HtmlSource {
    Url(String),
    /// A saved copy of the page, read from disk.
    File(PathBuf),
}

impl HtmlSource {
    pub async fn fetch(&self) -> Result<String> {
        match self {
            HtmlSource::Url(url) => fetch_url(url).await,
            HtmlSource::File(path) => {
                info!("Reading page snapshot: {}", path.display());
                Ok(tokio::fs::read_to_string(path).await?)
            }
        }
    }
}

/// Single GET, no retries. Non-2xx responses are errors.
async fn fetch_url(url: &str) -> Result<String> {
    info!("Fetching page: {}", url);
    let html = reqwest::Client::new()
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    info!("Fetched {} bytes", html.len());
    Ok(html)
}
