//! Search service facade.
//!
//! Owns the process-wide lexical index. Readers take a cheap clone of the
//! published snapshot; builds run one at a time into a fresh snapshot that is
//! swapped in when complete, so a search never sees rows from one build and
//! IDs from another. Ranking needs only the snapshot; the corpus source is
//! consulted just long enough to extract it.

use crate::corpus::{extract_from, BusinessSource, CorpusEntry};
use crate::error::{Error, Result};
use crate::tfidf::{LexicalIndex, ScoredHit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, info};

/// Default number of ranked results
pub const DEFAULT_TOP_K: usize = 10;

/// Ranking backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// TF-IDF weighted vectors with cosine similarity
    #[default]
    Tfidf,
}

impl SearchBackend {
    /// Stable name used in configuration and status output
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchBackend::Tfidf => "tfidf",
        }
    }
}

impl std::str::FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" => Ok(SearchBackend::Tfidf),
            other => Err(format!("Unknown search backend: {}", other)),
        }
    }
}

/// Published index plus build metadata
#[derive(Debug, Default)]
struct IndexSnapshot {
    index: LexicalIndex,
    built_at: Option<DateTime<Utc>>,
}

/// Observable state of the published index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Number of indexed businesses
    pub documents: usize,

    /// Vocabulary size of the fitted model
    pub vocabulary: usize,

    /// Completion time of the last build, `None` before the first one
    pub built_at: Option<DateTime<Utc>>,

    /// Active backend
    pub backend: SearchBackend,
}

/// Lexical search facade shared by request handlers
pub struct SearchService {
    backend: SearchBackend,
    current: RwLock<Arc<IndexSnapshot>>,
    build_lock: Mutex<()>,
}

impl SearchService {
    /// Create a service with an empty index
    pub fn new(backend: SearchBackend) -> Self {
        Self {
            backend,
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
            build_lock: Mutex::new(()),
        }
    }

    /// Active backend
    pub fn backend(&self) -> SearchBackend {
        self.backend
    }

    /// IDs of the businesses most similar to `query`, best first
    ///
    /// Builds the index from `source` first when nothing is indexed yet, so
    /// the first query after startup pays for a full corpus scan.
    pub fn search<S: BusinessSource + ?Sized>(&self, source: &S, query: &str, top_k: usize) -> Result<Vec<i64>> {
        Ok(self
            .search_scored(source, query, top_k)?
            .into_iter()
            .map(|hit| hit.id)
            .collect())
    }

    /// Same as [`SearchService::search`], keeping similarity scores
    pub fn search_scored<S: BusinessSource + ?Sized>(
        &self,
        source: &S,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredHit>> {
        if top_k == 0 {
            return Err(Error::InvalidTopK(top_k));
        }

        self.ensure_built_with(|| extract_from(source))?;
        self.rank_scored(query, top_k)
    }

    /// Rank against the published index only, never touching the store
    ///
    /// An index that was never built yields no hits.
    pub fn rank(&self, query: &str, top_k: usize) -> Result<Vec<i64>> {
        Ok(self
            .rank_scored(query, top_k)?
            .into_iter()
            .map(|hit| hit.id)
            .collect())
    }

    /// Same as [`SearchService::rank`], keeping similarity scores
    pub fn rank_scored(&self, query: &str, top_k: usize) -> Result<Vec<ScoredHit>> {
        if top_k == 0 {
            return Err(Error::InvalidTopK(top_k));
        }

        let snapshot = self.snapshot()?;
        let hits = snapshot.index.search_scored(query, top_k);
        debug!("Semantic query '{}' (top_k={}) returned {} hits", query, top_k, hits.len());
        Ok(hits)
    }

    /// Build from `load` if nothing is indexed yet
    ///
    /// `load` runs at most once across concurrent callers and only while the
    /// index is empty. The fit itself happens after `load` returns, so
    /// anything `load` locks is released before the expensive part.
    pub fn ensure_built_with<F, E>(&self, load: F) -> std::result::Result<(), E>
    where
        F: FnOnce() -> std::result::Result<Vec<CorpusEntry>, E>,
        E: From<Error>,
    {
        if self.is_built()? {
            return Ok(());
        }

        let _guard = self.lock_builds()?;
        // Another caller may have finished a build while we waited
        if self.is_built()? {
            return Ok(());
        }

        info!("Lexical index is empty, building on first query");
        let entries = load()?;
        self.publish(&entries)?;
        Ok(())
    }

    /// Rebuild the index from the current corpus regardless of state
    ///
    /// Returns the number of indexed businesses.
    pub fn reindex<S: BusinessSource + ?Sized>(&self, source: &S) -> Result<usize> {
        self.reindex_with(|| extract_from(source))
    }

    /// Rebuild from whatever `load` returns, regardless of state
    ///
    /// Builds are serialised around both `load` and the fit, so a slower
    /// earlier rebuild never overwrites a later one.
    pub fn reindex_with<F, E>(&self, load: F) -> std::result::Result<usize, E>
    where
        F: FnOnce() -> std::result::Result<Vec<CorpusEntry>, E>,
        E: From<Error>,
    {
        let _guard = self.lock_builds()?;
        let entries = load()?;
        Ok(self.publish(&entries)?)
    }

    /// Rebuild the index from an explicit corpus
    pub fn build(&self, entries: &[CorpusEntry]) -> Result<usize> {
        let _guard = self.lock_builds()?;
        self.publish(entries)
    }

    /// Whether any business is currently indexed
    pub fn is_built(&self) -> Result<bool> {
        Ok(!self.snapshot()?.index.is_empty())
    }

    /// Describe the published index
    pub fn status(&self) -> Result<IndexStatus> {
        let snapshot = self.snapshot()?;
        Ok(IndexStatus {
            documents: snapshot.index.len(),
            vocabulary: snapshot.index.vocabulary_len(),
            built_at: snapshot.built_at,
            backend: self.backend,
        })
    }

    fn snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|e| Error::LockPoisoned(e.to_string()))
    }

    fn lock_builds(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.build_lock
            .lock()
            .map_err(|e| Error::LockPoisoned(e.to_string()))
    }

    /// Fit a fresh index and swap it in; caller holds the build lock
    fn publish(&self, entries: &[CorpusEntry]) -> Result<usize> {
        let started = Instant::now();
        let index = match self.backend {
            SearchBackend::Tfidf => LexicalIndex::build(entries),
        };
        let documents = index.len();
        let vocabulary = index.vocabulary_len();

        let fresh = Arc::new(IndexSnapshot {
            index,
            built_at: Some(Utc::now()),
        });
        *self
            .current
            .write()
            .map_err(|e| Error::LockPoisoned(e.to_string()))? = fresh;

        info!(
            "Built {} index: {} documents, {} terms in {:?}",
            self.backend.as_str(),
            documents,
            vocabulary,
            started.elapsed()
        );
        Ok(documents)
    }
}

impl Default for SearchService {
    fn default() -> Self {
        Self::new(SearchBackend::default())
    }
}
