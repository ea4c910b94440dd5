pub mod http;
pub mod immoscout;
pub mod kleinanzeigen;
pub mod site;
pub mod traits;
pub mod types;
pub mod wg_gesucht;

pub use immoscout::ImmoScoutParser;
pub use kleinanzeigen::KleinanzeigenParser;
pub use site::SiteScraper;
pub use traits::ScraperTrait;
pub use types::SearchParams;
pub use wg_gesucht::WgGesuchtParser;

use crate::config::Config;
use anyhow::Result;

/// All supported sites, in the order they are visited per city
pub fn build_scrapers(config: &Config) -> Result<Vec<Box<dyn ScraperTrait>>> {
    let client = http::build_client(&config.scraping)?;
    let max = config.scraping.max_results_per_site;
    let params = SearchParams::from(&config.search_criteria);

    Ok(vec![
        Box::new(SiteScraper::new(
            client.clone(),
            ImmoScoutParser::new(params)?,
            max,
        )),
        Box::new(SiteScraper::new(client.clone(), WgGesuchtParser::new()?, max)),
        Box::new(SiteScraper::new(client, KleinanzeigenParser::new()?, max)),
    ])
}
