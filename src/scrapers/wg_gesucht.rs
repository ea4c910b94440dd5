use crate::models::{Listing, Source, UNKNOWN};
use crate::scrapers::site::{first_link, first_text, location_slug, selector};
use crate::scrapers::traits::SiteParser;
use anyhow::Result;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info};

const BASE_URL: &str = "https://www.wg-gesucht.de/";

/// WG-Gesucht city listing page. Cards don't show an address, so the
/// queried city is used as location.
pub struct WgGesuchtParser {
    base: Url,
    card: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
}

impl WgGesuchtParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: Url::parse(BASE_URL)?,
            card: selector("div.wgg_card")?,
            title: selector("h3.headline")?,
            price: selector("div.col-xs-3")?,
            link: selector("a[href]")?,
        })
    }
}

impl SiteParser for WgGesuchtParser {
    fn source(&self) -> Source {
        Source::WgGesucht
    }

    fn search_url(&self, location: &str) -> Result<Url> {
        let page = format!("wohnungen-in-{}.html", location_slug(location));
        Ok(self.base.join(&page)?)
    }

    fn parse_listings(&self, html: &str, location: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for (idx, card) in document.select(&self.card).enumerate() {
            let Some(title) = first_text(card, &self.title) else {
                debug!(idx, "Skipped WG-Gesucht card without title");
                continue;
            };
            let Some(url) = first_link(card, &self.link, &self.base) else {
                debug!(idx, title = %title, "Skipped WG-Gesucht card without link");
                continue;
            };

            listings.push(Listing {
                title,
                price: first_text(card, &self.price).unwrap_or_else(|| "N/A".to_string()),
                location: location.to_string(),
                rooms: UNKNOWN.to_string(),
                size: UNKNOWN.to_string(),
                url,
                source: Source::WgGesucht,
                description: String::new(),
            });
        }

        info!(count = listings.len(), "Parsed WG-Gesucht listings");
        listings
    }
}
