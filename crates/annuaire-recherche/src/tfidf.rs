// Lexical Index Implementation
//
// *L'Index* (The Index) - TF-IDF weighted document vectors with cosine ranking

use crate::corpus::CorpusEntry;
use crate::tokenizer::analyze;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// One sparse document row: `(column, weight)` pairs sorted by column
type SparseRow = Vec<(u32, f32)>;

/// TF-IDF index over a corpus snapshot
///
/// Either empty (no build yet, or built from an empty corpus) or fully
/// consistent with one corpus: `id_to_pk` has one entry per row, and every
/// column in `rows` is a position in the fitted vocabulary.
///
/// Weighting follows the usual smoothed scheme:
/// `idf(t) = ln((1 + n) / (1 + df(t))) + 1`, row weight `count * idf`, and each
/// row is L2-normalised so a dot product is the cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    /// Term to column, columns assigned in lexicographic term order
    vocabulary: HashMap<String, u32>,

    /// Inverse document frequency per column
    idf: Vec<f32>,

    /// Normalised document rows, in corpus order
    rows: Vec<SparseRow>,

    /// Row position to business ID
    id_to_pk: Vec<i64>,
}

/// Ranked search hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    /// Business ID
    pub id: i64,

    /// Cosine similarity with the query (0.0 to 1.0)
    pub score: f32,
}

impl LexicalIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit a fresh index over `entries`
    ///
    /// Rows follow the order of `entries`. An empty slice yields the empty index.
    pub fn build(entries: &[CorpusEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }

        let documents: Vec<HashMap<String, u32>> = entries
            .iter()
            .map(|entry| {
                let mut counts = HashMap::new();
                for term in analyze(&entry.text) {
                    *counts.entry(term).or_insert(0u32) += 1;
                }
                counts
            })
            .collect();

        let mut document_frequency: BTreeMap<&str, u32> = BTreeMap::new();
        for counts in &documents {
            for term in counts.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = entries.len() as f32;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (column, (term, df)) in document_frequency.iter().enumerate() {
            vocabulary.insert((*term).to_string(), column as u32);
            idf.push(((1.0 + n) / (1.0 + *df as f32)).ln() + 1.0);
        }

        let rows = documents
            .iter()
            .map(|counts| {
                let mut row: SparseRow = counts
                    .iter()
                    .map(|(term, count)| {
                        let column = vocabulary[term.as_str()];
                        (column, *count as f32 * idf[column as usize])
                    })
                    .collect();
                row.sort_unstable_by_key(|(column, _)| *column);
                normalize(&mut row);
                row
            })
            .collect();

        Self {
            vocabulary,
            idf,
            rows,
            id_to_pk: entries.iter().map(|e| e.id).collect(),
        }
    }

    /// Replace the whole index with one fitted over `entries`
    pub fn rebuild(&mut self, entries: &[CorpusEntry]) {
        *self = Self::build(entries);
    }

    /// Business IDs of the `top_k` rows most similar to `query`
    pub fn search(&self, query: &str, top_k: usize) -> Vec<i64> {
        self.search_scored(query, top_k)
            .into_iter()
            .map(|hit| hit.id)
            .collect()
    }

    /// Rank rows by cosine similarity with `query`
    ///
    /// Ties keep row order, so repeated calls give identical output. Terms
    /// outside the vocabulary contribute nothing; a query with no known terms
    /// returns the first `top_k` rows with score 0.
    pub fn search_scored(&self, query: &str, top_k: usize) -> Vec<ScoredHit> {
        if self.id_to_pk.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query_vector = self.vectorize(query);
        let mut ranked: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(position, row)| (position, dot(&query_vector, row)))
            .collect();

        let by_rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
        };

        if top_k < ranked.len() {
            ranked.select_nth_unstable_by(top_k - 1, by_rank);
            ranked.truncate(top_k);
        }
        ranked.sort_unstable_by(by_rank);

        ranked
            .into_iter()
            .map(|(position, score)| ScoredHit {
                id: self.id_to_pk[position],
                score,
            })
            .collect()
    }

    /// Project free text into the fitted space (normalised, sparse)
    fn vectorize(&self, text: &str) -> HashMap<u32, f32> {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for term in analyze(text) {
            if let Some(&column) = self.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0) += 1;
            }
        }

        let mut vector: SparseRow = counts
            .into_iter()
            .map(|(column, count)| (column, count as f32 * self.idf[column as usize]))
            .collect();
        normalize(&mut vector);
        vector.into_iter().collect()
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.id_to_pk.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.id_to_pk.is_empty()
    }

    /// Number of distinct terms in the fitted vocabulary
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Row position to business ID mapping
    pub fn ids(&self) -> &[i64] {
        &self.id_to_pk
    }

    /// Fitted IDF weight of a term, if it is in the vocabulary
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary
            .get(term)
            .map(|&column| self.idf[column as usize])
    }
}

/// Scale a sparse vector to unit length; zero vectors stay zero
fn normalize(vector: &mut SparseRow) {
    let norm = vector.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, weight) in vector.iter_mut() {
            *weight /= norm;
        }
    }
}

fn dot(query: &HashMap<u32, f32>, row: &SparseRow) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    row.iter()
        .filter_map(|(column, weight)| query.get(column).map(|q| q * weight))
        .sum()
}
