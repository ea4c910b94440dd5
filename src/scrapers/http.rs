//! HTTP client shared by all scrapers.

use crate::config::ScrapingConfig;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Url};
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Create the HTTP client with browser-like headers and a bounded timeout
pub fn build_client(config: &ScrapingConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"));

    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .context("Failed to create HTTP client")
}

/// Fetch a page body, treating any non-2xx status as an error
pub async fn fetch_html(client: &Client, url: &Url) -> Result<String> {
    debug!(url = %url, "Fetching URL");

    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("{} returned status {}", url, status);
    }

    let html = response
        .text()
        .await
        .context("Failed to read response body")?;
    debug!(bytes = html.len(), "Downloaded HTML");
    Ok(html)
}
