use crate::models::{Listing, Source};
use crate::scrapers::http::fetch_html;
use crate::scrapers::traits::{ScraperTrait, SiteParser};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Selector};
use tracing::{info, warn};

/// Scraper for one site: fetch, parse, cap.
pub struct SiteScraper<P> {
    client: Client,
    parser: P,
    max_results: usize,
}

impl<P: SiteParser> SiteScraper<P> {
    pub fn new(client: Client, parser: P, max_results: usize) -> Self {
        Self {
            client,
            parser,
            max_results,
        }
    }
}

#[async_trait]
impl<P: SiteParser + 'static> ScraperTrait for SiteScraper<P> {
    async fn scrape(&self, location: &str) -> Vec<Listing> {
        let source = self.parser.source();
        info!(source = %source, location, "Scraping");

        let url = match self.parser.search_url(location) {
            Ok(url) => url,
            Err(e) => {
                warn!(source = %source, location, error = %e, "Could not build search URL");
                return Vec::new();
            }
        };

        let html = match fetch_html(&self.client, &url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(source = %source, error = %e, "Fetch failed, no listings from this site");
                return Vec::new();
            }
        };

        let mut listings = self.parser.parse_listings(&html, location);
        listings.truncate(self.max_results);
        info!(source = %source, count = listings.len(), "Scraped listings");
        listings
    }

    fn source(&self) -> Source {
        self.parser.source()
    }
}

/// Compile a CSS selector, keeping the offending text in the error
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))
}

/// Visible text of an element with whitespace collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match below `element`, if it has any
pub(crate) fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Absolute URL of the first matching link below `element`
pub(crate) fn first_link(element: ElementRef<'_>, selector: &Selector, base: &Url) -> Option<String> {
    let href = element.select(selector).next()?.value().attr("href")?;
    base.join(href.trim()).ok().map(String::from)
}

/// Location as it appears in site paths: "Bad Sassendorf" -> "bad-sassendorf"
pub(crate) fn location_slug(location: &str) -> String {
    location
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}
