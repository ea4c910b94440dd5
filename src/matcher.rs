//! Criteria matching for scraped listings.

use crate::config::SearchCriteria;
use crate::models::Listing;
use regex::Regex;
use std::sync::OnceLock;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("valid number pattern"))
}

/// Check a listing against the search criteria.
///
/// Excluded keywords win over required keywords. A price without any
/// number in it never rejects a listing.
pub fn matches(listing: &Listing, criteria: &SearchCriteria) -> bool {
    if let Some(price) = parse_price(&listing.price) {
        if price > criteria.max_price {
            return false;
        }
    }

    if criteria.enforce_room_range {
        if let Some(rooms) = parse_price(&listing.rooms) {
            if rooms < criteria.min_rooms || rooms > criteria.max_rooms {
                return false;
            }
        }
    }

    let text = format!("{} {}", listing.title, listing.description).to_lowercase();

    if criteria
        .excluded_keywords
        .iter()
        .any(|kw| text.contains(&kw.to_lowercase()))
    {
        return false;
    }

    if !criteria.keywords.is_empty()
        && !criteria
            .keywords
            .iter()
            .any(|kw| text.contains(&kw.to_lowercase()))
    {
        return false;
    }

    true
}

/// Extract the first number from locale formatted text.
///
/// German and English separators are both understood: "1.150 €" is 1150,
/// "850,50" is 850.5, "1.150,50" and "1,150.50" are 1150.5. A lone dot
/// followed by exactly three digits is read as a thousands separator.
pub fn parse_price(text: &str) -> Option<f64> {
    let token = number_pattern().find(text)?.as_str();

    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (None, Some(_)) => {
            if token.matches(',').count() == 1 {
                token.replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (Some(_), None) => {
            let grouped = token.split('.').skip(1).all(|group| group.len() == 3);
            if grouped {
                token.replace('.', "")
            } else {
                token.to_string()
            }
        }
        (None, None) => token.to_string(),
    };

    normalized.parse::<f64>().ok().or_else(|| {
        // "1.2.3": keep the leading integer part
        token
            .split(|c: char| c == '.' || c == ',')
            .next()
            .and_then(|digits| digits.parse().ok())
    })
}
