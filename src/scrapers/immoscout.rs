use crate::models::{Listing, Source, UNKNOWN};
use crate::scrapers::site::{first_link, first_text, location_slug, selector};
use crate::scrapers::traits::SiteParser;
use crate::scrapers::types::SearchParams;
use anyhow::{anyhow, Result};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

const BASE_URL: &str = "https://www.immobilienscout24.de";

/// ImmobilienScout24 search result page.
///
/// The only site that filters on its side, so price and room range go
/// into the query string.
pub struct ImmoScoutParser {
    params: SearchParams,
    base: Url,
    card: Selector,
    title: Selector,
    price: Selector,
    address: Selector,
    link: Selector,
}

impl ImmoScoutParser {
    pub fn new(params: SearchParams) -> Result<Self> {
        Ok(Self {
            params,
            base: Url::parse(BASE_URL)?,
            card: selector("div.result-list-entry")?,
            title: selector("h2.result-list-entry__brand-title-container")?,
            price: selector("dd.grid-item")?,
            address: selector("div.result-list-entry__address")?,
            link: selector("a[href]")?,
        })
    }

    fn parse_card(&self, card: ElementRef<'_>) -> Option<Listing> {
        Some(Listing {
            title: first_text(card, &self.title)?,
            price: first_text(card, &self.price)?,
            location: first_text(card, &self.address)?,
            rooms: UNKNOWN.to_string(),
            size: UNKNOWN.to_string(),
            url: first_link(card, &self.link, &self.base)?,
            source: Source::ImmobilienScout24,
            description: String::new(),
        })
    }
}

impl SiteParser for ImmoScoutParser {
    fn source(&self) -> Source {
        Source::ImmobilienScout24
    }

    fn search_url(&self, location: &str) -> Result<Url> {
        let slug = location_slug(location);
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("{} cannot take a path", BASE_URL))?
            .pop_if_empty()
            .extend(["Suche", "de", slug.as_str(), "wohnung-mieten"]);
        url.query_pairs_mut()
            .append_pair("price", &format!("-{}", self.params.max_price))
            .append_pair(
                "numberofrooms",
                &format!("{}-{}", self.params.min_rooms, self.params.max_rooms),
            )
            .append_pair("petsallowedtypes", "yes,negotiable");
        Ok(url)
    }

    fn parse_listings(&self, html: &str, _location: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let cards: Vec<_> = document.select(&self.card).collect();
        info!(count = cards.len(), "Found ImmobilienScout24 cards");

        cards
            .into_iter()
            .enumerate()
            .filter_map(|(idx, card)| {
                let listing = self.parse_card(card);
                if listing.is_none() {
                    debug!(idx, "Skipped ImmobilienScout24 card with missing fields");
                }
                listing
            })
            .collect()
    }
}
