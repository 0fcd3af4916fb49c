//! API response types

use annuaire_recherche::IndexStatus;
use annuaire_stockage::BusinessRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business fields returned by both search endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSummary {
    /// Business ID
    pub id: i64,

    /// Display name
    pub name: String,

    /// Free-text description
    pub description: String,

    /// City
    pub city: String,

    /// Country
    pub country: String,

    /// Mean review rating
    pub average_rating: f64,

    /// Number of reviews
    pub rating_count: u32,
}

impl From<&BusinessRecord> for BusinessSummary {
    fn from(record: &BusinessRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            city: record.city.clone(),
            country: record.country.clone(),
            average_rating: record.average_rating,
            rating_count: record.rating_count,
        }
    }
}

/// Search results response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResultsResponse {
    /// Matching businesses, best first
    pub results: Vec<BusinessSummary>,
}

impl SearchResultsResponse {
    /// Create empty response
    pub fn empty() -> Self {
        Self::default()
    }

    /// Project store records into a response, keeping their order
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a BusinessRecord>) -> Self {
        Self {
            results: records.into_iter().map(BusinessSummary::from).collect(),
        }
    }
}

/// Reindex response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexResponse {
    /// Number of businesses in the rebuilt index
    pub indexed: usize,
}

/// Index status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatusResponse {
    /// Number of indexed businesses
    pub documents: usize,

    /// Vocabulary size
    pub vocabulary: usize,

    /// Last build time, null before the first build
    pub built_at: Option<DateTime<Utc>>,

    /// Ranking backend name
    pub backend: String,
}

impl From<IndexStatus> for IndexStatusResponse {
    fn from(status: IndexStatus) -> Self {
        Self {
            documents: status.documents,
            vocabulary: status.vocabulary,
            built_at: status.built_at,
            backend: status.backend.as_str().to_string(),
        }
    }
}
