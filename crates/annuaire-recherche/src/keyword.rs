//! Keyword filter: containment matching against the store, no index involved.

use crate::corpus::BusinessSource;
use crate::error::Result;
use annuaire_stockage::{BusinessRecord, KEYWORD_RESULT_LIMIT};
use tracing::debug;

/// Substring search over name, description, city, country and category
#[derive(Debug, Clone, Copy)]
pub struct KeywordFilter {
    limit: usize,
}

impl KeywordFilter {
    /// Create a filter returning at most `limit` businesses
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Maximum number of results
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Businesses containing `query` in any searchable field, best rated first
    ///
    /// An empty query returns the best rated businesses unfiltered.
    pub fn search<S: BusinessSource + ?Sized>(&self, source: &S, query: &str) -> Result<Vec<BusinessRecord>> {
        let results = source.keyword_matches(query, self.limit)?;
        debug!("Keyword query '{}' matched {} businesses", query, results.len());
        Ok(results)
    }
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(KEYWORD_RESULT_LIMIT)
    }
}
