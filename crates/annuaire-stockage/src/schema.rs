// Storage schema and database management

use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Whether to enable WAL mode
    pub wal_enabled: bool,

    /// Cache size in pages
    pub cache_size_pages: Option<usize>,

    /// Whether SQLite enforces foreign keys
    pub foreign_keys: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            wal_enabled: true,
            cache_size_pages: Some(10000),
            foreign_keys: true,
        }
    }
}

/// Main storage interface
pub struct Storage {
    conn: Connection,
    config: StorageConfig,
}

impl Storage {
    /// Open storage with default config
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        Self::open_with_config(path, StorageConfig::default())
    }

    /// Open storage with custom config
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StorageConfig) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, config)
    }

    /// Open a private in-memory database, mostly for tests and demos
    pub fn open_in_memory() -> SqliteResult<Self> {
        let config = StorageConfig {
            wal_enabled: false,
            ..StorageConfig::default()
        };
        Self::from_connection(Connection::open_in_memory()?, config)
    }

    fn from_connection(conn: Connection, config: StorageConfig) -> SqliteResult<Self> {
        // journal_mode answers with the resulting mode, so it needs the checked variant
        if config.wal_enabled {
            let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get(0)
            })?;
            debug!("SQLite journal mode: {}", mode);
        }

        if let Some(cache_size) = config.cache_size_pages {
            conn.pragma_update(None, "cache_size", cache_size)?;
        }

        if config.foreign_keys {
            conn.pragma_update(None, "foreign_keys", true)?;
        }

        register_functions(&conn)?;

        let mut storage = Self { conn, config };
        storage.initialize_schema()?;

        Ok(storage)
    }

    /// Initialize database schema
    fn initialize_schema(&mut self) -> SqliteResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )",
            [],
        )?;

        // ON DELETE SET NULL keeps a business listed when its category goes away
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS businesses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                address TEXT NOT NULL DEFAULT '',
                city TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL DEFAULT '',
                website TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                average_rating REAL NOT NULL DEFAULT 0,
                rating_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_businesses_category ON businesses(category_id)",
            "CREATE INDEX IF NOT EXISTS idx_businesses_rating ON businesses(average_rating DESC, rating_count DESC)",
        ];
        for index_sql in indexes {
            self.conn.execute(index_sql, [])?;
        }

        Ok(())
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL into the main database file
    pub fn close(&mut self) -> SqliteResult<()> {
        if self.config.wal_enabled {
            self.conn
                .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        }
        Ok(())
    }
}

/// Register `casefold(text)`, Unicode lowercase with NULL passed through
///
/// `LIKE` only ignores case for ASCII letters, so keyword matching compares
/// `casefold(column)` against an already lowercased pattern.
fn register_functions(conn: &Connection) -> SqliteResult<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}
