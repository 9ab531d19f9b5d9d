// src/store.rs
// SQLite adapter: existence lookup, conflict-policy upsert, out-of-band
// removal, and whole-store JSON export. The pipeline owns no persisted
// state outside this module.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StoreError;
use crate::reconcile::OrgRecord;

pub const TABLE: &str = "charities";

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS charities (
    ein              TEXT NOT NULL UNIQUE,
    name             TEXT,
    website          TEXT,
    nonprofit_status TEXT,
    review           REAL,
    address          TEXT,
    phone            TEXT,
    mission          TEXT,
    categories       TEXT,
    rating           REAL
);";

/// Conflict policy for `upsert`. Replace swaps the full row on a key
/// collision; it never merges field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnConflict {
    #[default]
    Replace,
    Ignore,
    Abort,
}

impl OnConflict {
    fn clause(self) -> &'static str {
        match self {
            OnConflict::Replace => "OR REPLACE",
            OnConflict::Ignore => "OR IGNORE",
            OnConflict::Abort => "OR ABORT",
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!(path = %path.display(), "opening store");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Store { conn })
    }

    /// Bulk key snapshot, taken once per run for the skip guard.
    pub fn exists_keys(&self) -> Result<HashSet<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT ein FROM charities")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = HashSet::new();
        for key in rows {
            keys.insert(key?);
        }
        Ok(keys)
    }

    pub fn upsert(&self, record: &OrgRecord, policy: OnConflict) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT {} INTO charities \
             (ein, name, website, nonprofit_status, review, address, phone, mission, categories, rating) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            policy.clause()
        );
        self.conn.execute(
            &sql,
            params![
                record.ein,
                record.name,
                record.website,
                record.nonprofit_status,
                record.review,
                record.address,
                record.phone,
                record.mission,
                record.categories,
                record.rating,
            ],
        )?;
        Ok(())
    }

    /// Explicit removal by key; not part of the normal ingestion path.
    /// Returns the number of rows deleted.
    pub fn delete_by_key(&self, ein: &str) -> Result<usize, StoreError> {
        Ok(self.conn.execute("DELETE FROM charities WHERE ein = ?1", params![ein])?)
    }

    /// Serialize every table as `{ table_name: [row objects...] }`, for
    /// downstream consumption.
    pub fn export_json(&self) -> Result<Value, StoreError> {
        let mut tables = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            )?;
            let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for name in names {
                tables.push(name?);
            }
        }

        let mut doc = Map::new();
        for table in tables {
            // Table names come from sqlite_master, not from user input.
            let mut stmt = self.conn.prepare(&format!("SELECT * FROM {table}"))?;
            let columns: Vec<String> =
                stmt.column_names().iter().map(|c| c.to_string()).collect();

            let mut out_rows = Vec::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let mut obj = Map::new();
                for (i, col) in columns.iter().enumerate() {
                    obj.insert(col.clone(), json_of(row.get_ref(i)?));
                }
                out_rows.push(Value::Object(obj));
            }
            doc.insert(table, Value::Array(out_rows));
        }
        Ok(Value::Object(doc))
    }
}

fn json_of(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => {
            serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
        }
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        // The schema stores no blobs; don't invent a representation.
        ValueRef::Blob(_) => Value::Null,
    }
}
