// Business persistence operations

use crate::categories::CategoryStore;
use crate::schema::Storage;
use rusqlite::{params, params_from_iter, OptionalExtension, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default row cap for the keyword search path
pub const KEYWORD_RESULT_LIMIT: usize = 50;

/// IDs bound per `IN (...)` statement, well under SQLite's variable limit
const MAX_IDS_PER_QUERY: usize = 500;

const SELECT_COLUMNS: &str = "SELECT b.id, b.name, b.description, b.category_id, c.name, b.address, \
     b.city, b.country, b.website, b.phone, b.average_rating, b.rating_count, b.created_at, b.updated_at \
     FROM businesses b LEFT JOIN categories c ON c.id = b.category_id";

/// Business record as read back from the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    /// Unique database ID
    pub id: i64,
    /// Display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Owning category, if any
    pub category_id: Option<i64>,
    /// Name of the owning category, if any
    pub category_name: Option<String>,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// Country
    pub country: String,
    /// Website URL
    pub website: String,
    /// Phone number
    pub phone: String,
    /// Mean review rating
    pub average_rating: f64,
    /// Number of reviews behind `average_rating`
    pub rating_count: u32,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Last update time (unix seconds)
    pub updated_at: i64,
}

impl BusinessRecord {
    fn from_row(row: &Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category_id: row.get(3)?,
            category_name: row.get(4)?,
            address: row.get(5)?,
            city: row.get(6)?,
            country: row.get(7)?,
            website: row.get(8)?,
            phone: row.get(9)?,
            average_rating: row.get(10)?,
            rating_count: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

/// Fields needed to create a business
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBusiness {
    /// Display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Category name; created on demand
    pub category: Option<String>,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// Country
    pub country: String,
    /// Website URL
    pub website: String,
    /// Phone number
    pub phone: String,
    /// Initial mean rating
    pub average_rating: f64,
    /// Initial rating count
    pub rating_count: u32,
}

impl NewBusiness {
    /// Shorthand for the fields the search subsystem cares about
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            city: city.into(),
            country: country.into(),
            ..Self::default()
        }
    }

    /// Set the category name
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the rating aggregate
    pub fn with_rating(mut self, average_rating: f64, rating_count: u32) -> Self {
        self.average_rating = average_rating;
        self.rating_count = rating_count;
        self
    }
}

/// Business store for CRUD and search-facing queries
pub struct BusinessStore<'a> {
    storage: &'a Storage,
}

impl<'a> BusinessStore<'a> {
    /// Create a new business store
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Insert a business record, creating its category if needed
    pub fn insert(&self, business: &NewBusiness) -> SqliteResult<i64> {
        let category_id = match business.category.as_deref() {
            Some(name) => Some(CategoryStore::new(self.storage).get_or_insert(name)?),
            None => None,
        };
        let now = chrono::Utc::now().timestamp();

        self.storage.conn().execute(
            "INSERT INTO businesses (name, description, category_id, address, city, country, website, phone, average_rating, rating_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                business.name,
                business.description,
                category_id,
                business.address,
                business.city,
                business.country,
                business.website,
                business.phone,
                business.average_rating,
                business.rating_count,
                now,
                now,
            ],
        )?;

        Ok(self.storage.conn().last_insert_rowid())
    }

    /// Insert several businesses in one transaction
    pub fn batch_insert(&self, businesses: &[NewBusiness]) -> SqliteResult<Vec<i64>> {
        let tx = self.storage.conn().unchecked_transaction()?;

        let mut ids = Vec::with_capacity(businesses.len());
        for business in businesses {
            ids.push(self.insert(business)?);
        }

        tx.commit()?;
        Ok(ids)
    }

    /// Get business by ID
    pub fn get(&self, id: i64) -> SqliteResult<Option<BusinessRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE b.id = ?1");
        self.storage
            .conn()
            .query_row(&sql, params![id], BusinessRecord::from_row)
            .optional()
    }

    /// Delete a business, returning whether a row was removed
    pub fn delete(&self, id: i64) -> SqliteResult<bool> {
        let affected = self
            .storage
            .conn()
            .execute("DELETE FROM businesses WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Overwrite the rating aggregate of a business
    pub fn update_rating(&self, id: i64, average_rating: f64, rating_count: u32) -> SqliteResult<bool> {
        let affected = self.storage.conn().execute(
            "UPDATE businesses SET average_rating = ?1, rating_count = ?2, updated_at = ?3 WHERE id = ?4",
            params![average_rating, rating_count, chrono::Utc::now().timestamp(), id],
        )?;
        Ok(affected > 0)
    }

    /// All businesses in store iteration order (ascending ID)
    pub fn list_all(&self) -> SqliteResult<Vec<BusinessRecord>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY b.id");
        let mut stmt = self.storage.conn().prepare(&sql)?;
        let rows = stmt.query_map([], BusinessRecord::from_row)?;
        rows.collect()
    }

    /// Fetch the businesses whose IDs are listed; unknown IDs are skipped
    ///
    /// The result is in ascending ID order, not in the order of `ids`.
    /// Large ID lists are fetched in chunks to stay under the bound-variable limit.
    pub fn get_many(&self, ids: &[i64]) -> SqliteResult<Vec<BusinessRecord>> {
        let mut found = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("{SELECT_COLUMNS} WHERE b.id IN ({placeholders})");
            let mut stmt = self.storage.conn().prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), BusinessRecord::from_row)?;
            for row in rows {
                found.push(row?);
            }
        }

        // An ID repeated across chunks comes back once per chunk
        found.sort_unstable_by_key(|b| b.id);
        found.dedup_by_key(|b| b.id);
        Ok(found)
    }

    /// Number of stored businesses
    pub fn count(&self) -> SqliteResult<usize> {
        let count: i64 = self
            .storage
            .conn()
            .query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Case-insensitive containment search over name, description, city,
    /// country and category name
    ///
    /// Case folding is Unicode-aware through the `casefold` SQL function.
    /// Ordered by average rating, then rating count (both descending), then ID.
    /// An empty query matches every business.
    pub fn keyword_search(&self, query: &str, limit: usize) -> SqliteResult<Vec<BusinessRecord>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        debug!("Keyword search: pattern='{}', limit={}", pattern, limit);

        let sql = format!(
            "{SELECT_COLUMNS}
             WHERE casefold(b.name) LIKE ?1 ESCAPE '\\'
                OR casefold(b.description) LIKE ?1 ESCAPE '\\'
                OR casefold(b.city) LIKE ?1 ESCAPE '\\'
                OR casefold(b.country) LIKE ?1 ESCAPE '\\'
                OR casefold(c.name) LIKE ?1 ESCAPE '\\'
             ORDER BY b.average_rating DESC, b.rating_count DESC, b.id ASC
             LIMIT ?2"
        );
        let mut stmt = self.storage.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, limit as i64], BusinessRecord::from_row)?;
        rows.collect()
    }
}

/// Escape LIKE wildcards so the query is matched literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
