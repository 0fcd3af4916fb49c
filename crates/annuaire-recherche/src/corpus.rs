//! Corpus extraction: one text blob per business, in store order.

use crate::error::Result;
use annuaire_stockage::{BusinessRecord, BusinessStore, Storage};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A business projected for indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Business ID
    pub id: i64,

    /// Concatenated searchable text
    pub text: String,
}

impl CorpusEntry {
    /// Create a corpus entry
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Read access to the businesses the search subsystem works over
///
/// Implemented for the SQLite [`Storage`] and for in-memory slices of
/// records.
pub trait BusinessSource {
    /// Every business, in store iteration order
    fn all_businesses(&self) -> Result<Vec<BusinessRecord>>;

    /// Businesses with the given IDs; unknown IDs are skipped, order unspecified
    fn businesses_by_ids(&self, ids: &[i64]) -> Result<Vec<BusinessRecord>>;

    /// Case-insensitive containment match over the searchable fields,
    /// best rated first, at most `limit` rows
    fn keyword_matches(&self, query: &str, limit: usize) -> Result<Vec<BusinessRecord>>;
}

impl BusinessSource for Storage {
    fn all_businesses(&self) -> Result<Vec<BusinessRecord>> {
        Ok(BusinessStore::new(self).list_all()?)
    }

    fn businesses_by_ids(&self, ids: &[i64]) -> Result<Vec<BusinessRecord>> {
        Ok(BusinessStore::new(self).get_many(ids)?)
    }

    fn keyword_matches(&self, query: &str, limit: usize) -> Result<Vec<BusinessRecord>> {
        Ok(BusinessStore::new(self).keyword_search(query, limit)?)
    }
}

impl BusinessSource for [BusinessRecord] {
    fn all_businesses(&self) -> Result<Vec<BusinessRecord>> {
        Ok(self.to_vec())
    }

    fn businesses_by_ids(&self, ids: &[i64]) -> Result<Vec<BusinessRecord>> {
        Ok(self.iter().filter(|b| ids.contains(&b.id)).cloned().collect())
    }

    fn keyword_matches(&self, query: &str, limit: usize) -> Result<Vec<BusinessRecord>> {
        let needle = query.to_lowercase();
        let mut matches: Vec<BusinessRecord> = self
            .iter()
            .filter(|b| {
                [
                    b.name.as_str(),
                    b.description.as_str(),
                    b.city.as_str(),
                    b.country.as_str(),
                    b.category_name.as_deref().unwrap_or_default(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.average_rating
                .partial_cmp(&a.average_rating)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.rating_count.cmp(&a.rating_count))
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

impl BusinessSource for Vec<BusinessRecord> {
    fn all_businesses(&self) -> Result<Vec<BusinessRecord>> {
        self.as_slice().all_businesses()
    }

    fn businesses_by_ids(&self, ids: &[i64]) -> Result<Vec<BusinessRecord>> {
        self.as_slice().businesses_by_ids(ids)
    }

    fn keyword_matches(&self, query: &str, limit: usize) -> Result<Vec<BusinessRecord>> {
        self.as_slice().keyword_matches(query, limit)
    }
}

/// Searchable text of one business: `"{name}. {description} {city} {country} {category}"`
pub fn corpus_text(business: &BusinessRecord) -> String {
    format!(
        "{}. {} {} {} {}",
        business.name,
        business.description,
        business.city,
        business.country,
        business.category_name.as_deref().unwrap_or_default()
    )
}

/// Project every business into a corpus entry, preserving order
pub fn extract_corpus(businesses: &[BusinessRecord]) -> Vec<CorpusEntry> {
    businesses
        .iter()
        .map(|b| CorpusEntry::new(b.id, corpus_text(b)))
        .collect()
}

/// Read the full corpus from a source
pub fn extract_from<S: BusinessSource + ?Sized>(source: &S) -> Result<Vec<CorpusEntry>> {
    Ok(extract_corpus(&source.all_businesses()?))
}
