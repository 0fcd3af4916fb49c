//! Search errors

/// Result type for search operations
pub type Result<T> = std::result::Result<T, Error>;

/// Search errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The business store could not be read
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A ranked query asked for fewer than one result
    #[error("Invalid top_k: {0} (must be at least 1)")]
    InvalidTopK(usize),

    /// A thread panicked while holding the index lock
    #[error("Index lock poisoned: {0}")]
    LockPoisoned(String),
}
