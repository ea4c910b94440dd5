use crate::models::{Listing, Source};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;

/// Common trait for all listing scrapers
///
/// `scrape` never fails: a site that cannot be fetched yields no listings,
/// a card that cannot be parsed is skipped.
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Scrape listings for one location
    async fn scrape(&self, location: &str) -> Vec<Listing>;

    /// Get the source this scraper reads from
    fn source(&self) -> Source;
}

/// Site specific part of a scraper: where to look and how to read the page.
///
/// Kept free of I/O so it can be tested against captured markup.
pub trait SiteParser: Send + Sync {
    fn source(&self) -> Source;

    /// Search page URL for a location
    fn search_url(&self, location: &str) -> Result<Url>;

    /// Turn a search result page into listings
    fn parse_listings(&self, html: &str, location: &str) -> Vec<Listing>;
}
