use crate::models::{Listing, Source, UNKNOWN};
use crate::scrapers::site::{first_link, first_text, location_slug, selector};
use crate::scrapers::traits::SiteParser;
use anyhow::Result;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info};

const BASE_URL: &str = "https://www.kleinanzeigen.de/";

/// eBay Kleinanzeigen rental category (c203)
pub struct KleinanzeigenParser {
    base: Url,
    card: Selector,
    title: Selector,
    price: Selector,
    location: Selector,
    link: Selector,
}

impl KleinanzeigenParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: Url::parse(BASE_URL)?,
            card: selector("div.aditem")?,
            title: selector("h2.text-module-begin")?,
            price: selector("p.aditem-main--middle--price-shipping--price")?,
            location: selector("div.aditem-main--top--left")?,
            link: selector("a.ellipsis")?,
        })
    }
}

impl SiteParser for KleinanzeigenParser {
    fn source(&self) -> Source {
        Source::Kleinanzeigen
    }

    fn search_url(&self, location: &str) -> Result<Url> {
        let path = format!("s-wohnung-mieten/{}/c203", location_slug(location));
        Ok(self.base.join(&path)?)
    }

    fn parse_listings(&self, html: &str, location: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for (idx, card) in document.select(&self.card).enumerate() {
            let Some(title) = first_text(card, &self.title) else {
                debug!(idx, "Skipped Kleinanzeigen ad without title");
                continue;
            };
            let Some(url) = first_link(card, &self.link, &self.base) else {
                debug!(idx, title = %title, "Skipped Kleinanzeigen ad without link");
                continue;
            };

            listings.push(Listing {
                title,
                // "VB" = Verhandlungsbasis, the site's marker for negotiable
                price: first_text(card, &self.price).unwrap_or_else(|| "VB".to_string()),
                location: first_text(card, &self.location).unwrap_or_else(|| location.to_string()),
                rooms: UNKNOWN.to_string(),
                size: UNKNOWN.to_string(),
                url,
                source: Source::Kleinanzeigen,
                description: String::new(),
            });
        }

        info!(count = listings.len(), "Parsed Kleinanzeigen listings");
        listings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <ul id="srchrslt-adtable">
          <li><article><div class="aditem" data-adid="2801">
            <div class="aditem-main--top--left">59494 Soest</div>
            <h2 class="text-module-begin"><a class="ellipsis" href="/s-anzeige/gartenwohnung/2801">Gartenwohnung, Haustiere ok</a></h2>
            <p class="aditem-main--middle--price-shipping--price">850 €</p>
          </div></article></li>
          <li><article><div class="aditem" data-adid="2802">
            <h2 class="text-module-begin"><a class="ellipsis" href="/s-anzeige/altbau/2802">Altbau</a></h2>
          </div></article></li>
          <li><article><div class="aditem" data-adid="2803">
            <h2 class="text-module-begin">Ohne Link</h2>
          </div></article></li>
        </ul>"#;

    #[test]
    fn parses_ads_with_fallbacks() {
        let parser = KleinanzeigenParser::new().unwrap();
        let listings = parser.parse_listings(FIXTURE, "Soest");

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].title, "Gartenwohnung, Haustiere ok");
        assert_eq!(listings[0].price, "850 €");
        assert_eq!(listings[0].location, "59494 Soest");
        assert_eq!(
            listings[0].url,
            "https://www.kleinanzeigen.de/s-anzeige/gartenwohnung/2801"
        );
        assert_eq!(listings[1].price, "VB");
        assert_eq!(listings[1].location, "Soest");
        assert_eq!(listings[1].source, Source::Kleinanzeigen);
    }

    #[test]
    fn search_url_points_at_rental_category() {
        let parser = KleinanzeigenParser::new().unwrap();
        assert_eq!(
            parser.search_url("Soest").unwrap().as_str(),
            "https://www.kleinanzeigen.de/s-wohnung-mieten/soest/c203"
        );
    }
}
