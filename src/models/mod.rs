use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for room count or size when a site does not publish it
pub const UNKNOWN: &str = "unknown";

/// Source of the apartment listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    #[serde(rename = "ImmobilienScout24")]
    ImmobilienScout24,
    #[serde(rename = "WG-Gesucht")]
    WgGesucht,
    #[serde(rename = "eBay Kleinanzeigen")]
    Kleinanzeigen,
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::ImmobilienScout24 => "ImmobilienScout24",
            Source::WgGesucht => "WG-Gesucht",
            Source::Kleinanzeigen => "eBay Kleinanzeigen",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized listing produced by every scraper.
///
/// All text fields are taken as the site renders them; none of them is
/// guaranteed to be well formed. `price` in particular is locale formatted
/// ("1.150 €", "VB", "Preis auf Anfrage").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub title: String,
    pub price: String,
    pub location: String,
    pub rooms: String,
    pub size: String,
    pub url: String,
    pub source: Source,
    #[serde(default)]
    pub description: String,
}

impl Listing {
    /// Identity digest over title, price, location and url.
    ///
    /// Lowercase hex MD5, so seen-sets written by earlier versions of the
    /// tool keep matching.
    pub fn fingerprint(&self) -> String {
        let content = format!("{}{}{}{}", self.title, self.price, self.location, self.url);
        format!("{:x}", md5::compute(content.as_bytes()))
    }
}

#[cfg(test)]
pub(crate) fn sample_listing(title: &str, price: &str) -> Listing {
    Listing {
        title: title.to_string(),
        price: price.to_string(),
        location: "Soest".to_string(),
        rooms: UNKNOWN.to_string(),
        size: UNKNOWN.to_string(),
        url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        source: Source::WgGesucht,
        description: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let listing = sample_listing("Gartenwohnung", "900 €");
        assert_eq!(listing.fingerprint(), listing.fingerprint());
        assert_eq!(listing.fingerprint(), listing.clone().fingerprint());
        assert_eq!(listing.fingerprint().len(), 32);
    }

    #[test]
    fn fingerprint_changes_with_identity_fields() {
        let base = sample_listing("Gartenwohnung", "900 €");
        let fp = base.fingerprint();

        let mut other = base.clone();
        other.title.push('!');
        assert_ne!(other.fingerprint(), fp);

        let mut other = base.clone();
        other.price = "901 €".into();
        assert_ne!(other.fingerprint(), fp);

        let mut other = base.clone();
        other.location = "Lippstadt".into();
        assert_ne!(other.fingerprint(), fp);

        let mut other = base.clone();
        other.url.push_str("?page=2");
        assert_ne!(other.fingerprint(), fp);
    }

    #[test]
    fn fingerprint_ignores_non_identity_fields() {
        let base = sample_listing("Gartenwohnung", "900 €");
        let mut other = base.clone();
        other.description = "Frisch renoviert".into();
        other.rooms = "3".into();
        other.size = "75 m²".into();
        other.source = Source::Kleinanzeigen;
        assert_eq!(other.fingerprint(), base.fingerprint());
    }

    #[test]
    fn fingerprint_matches_plain_md5_of_concatenation() {
        let listing = Listing {
            title: "a".into(),
            price: "b".into(),
            location: "c".into(),
            rooms: UNKNOWN.into(),
            size: UNKNOWN.into(),
            url: "d".into(),
            source: Source::ImmobilienScout24,
            description: String::new(),
        };
        // md5("abcd")
        assert_eq!(listing.fingerprint(), "e2fc714c4727ee9395f324cd2e7f331f");
    }

    #[test]
    fn source_serializes_with_site_names() {
        let json = serde_json::to_string(&Source::Kleinanzeigen).unwrap();
        assert_eq!(json, "\"eBay Kleinanzeigen\"");
        assert_eq!(Source::WgGesucht.to_string(), "WG-Gesucht");
    }
}
