// annuaire-recherche - Directory Search
//
// *La Recherche* (The Search) - Lexical TF-IDF index and keyword filtering over businesses

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod corpus;
pub mod error;
pub mod keyword;
pub mod service;
pub mod tfidf;
pub mod tokenizer;

pub use corpus::{corpus_text, extract_corpus, extract_from, BusinessSource, CorpusEntry};
pub use error::{Error, Result};
pub use keyword::KeywordFilter;
pub use service::{IndexStatus, SearchBackend, SearchService, DEFAULT_TOP_K};
pub use tfidf::{LexicalIndex, ScoredHit};
