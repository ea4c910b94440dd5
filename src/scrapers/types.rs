use crate::config::SearchCriteria;
use serde::{Deserialize, Serialize};

/// Search parameters a site can filter on server side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    /// Maximum monthly rent (EUR)
    pub max_price: f64,
    /// Minimum number of rooms
    pub min_rooms: f64,
    /// Maximum number of rooms
    pub max_rooms: f64,
}

impl From<&SearchCriteria> for SearchParams {
    fn from(criteria: &SearchCriteria) -> Self {
        Self {
            max_price: criteria.max_price,
            min_rooms: criteria.min_rooms,
            max_rooms: criteria.max_rooms,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from(&SearchCriteria::default())
    }
}
