//! annuaire-stockage - Persistent Storage Layer
//!
//! *Le Stockage* (The Storage) - SQLite tables backing the business directory

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Business records, lookups and the keyword containment query.
pub mod businesses;
/// Category records.
pub mod categories;
/// Database schema and connection management.
pub mod schema;

pub use businesses::{BusinessRecord, BusinessStore, NewBusiness, KEYWORD_RESULT_LIMIT};
pub use categories::{CategoryRecord, CategoryStore};
pub use schema::{Storage, StorageConfig};
