// Category persistence operations

use crate::schema::Storage;
use rusqlite::{params, OptionalExtension, Result as SqliteResult};
use serde::{Deserialize, Serialize};

/// Category record for database storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Unique database ID
    pub id: i64,
    /// Unique category name
    pub name: String,
}

/// Category store for CRUD operations
pub struct CategoryStore<'a> {
    storage: &'a Storage,
}

impl<'a> CategoryStore<'a> {
    /// Create a new category store
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Insert a category, returning its ID
    pub fn insert(&self, name: &str) -> SqliteResult<i64> {
        self.storage
            .conn()
            .execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
        Ok(self.storage.conn().last_insert_rowid())
    }

    /// Get the ID of an existing category, inserting it when missing
    pub fn get_or_insert(&self, name: &str) -> SqliteResult<i64> {
        match self.get_by_name(name)? {
            Some(existing) => Ok(existing.id),
            None => self.insert(name),
        }
    }

    /// Find a category by its exact name
    pub fn get_by_name(&self, name: &str) -> SqliteResult<Option<CategoryRecord>> {
        self.storage
            .conn()
            .query_row(
                "SELECT id, name FROM categories WHERE name = ?1",
                params![name],
                |row| {
                    Ok(CategoryRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
    }

    /// List all categories ordered by name
    pub fn list(&self) -> SqliteResult<Vec<CategoryRecord>> {
        let mut stmt = self
            .storage
            .conn()
            .prepare("SELECT id, name FROM categories ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok(CategoryRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect()
    }

    /// Delete a category; businesses that referenced it lose their category
    pub fn delete(&self, id: i64) -> SqliteResult<bool> {
        let affected = self
            .storage
            .conn()
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}
