//! HTTP response cache entries.
//!
//! One row per cache key: the serialized response headers, the body, and the
//! local expiry time. Storing an entry whose key already exists overwrites
//! that row and keeps its identity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rowkeep_common::{Error, Identity, Result};
use rusqlite::types::FromSql;
use rusqlite::Row;

use crate::handle::Handle;
use crate::manager::{RecordBinding, RecordManager};
use crate::sql::{self, SelectQuery};

/// DDL for the `cache_entries` table.
pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    head TEXT NOT NULL DEFAULT '{}',
    data BLOB,
    local_expires INTEGER NOT NULL DEFAULT 0
);";

/// A cached HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: i64,
    pub key: String,
    /// Response headers; a name may carry several values.
    pub head: BTreeMap<String, Vec<String>>,
    pub data: Vec<u8>,
    pub local_expires: DateTime<Utc>,
}

impl CacheEntry {
    /// A new, not yet persisted entry.
    pub fn new(key: impl Into<String>, data: Vec<u8>, local_expires: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            key: key.into(),
            head: BTreeMap::new(),
            data,
            local_expires,
        }
    }

    /// Builder-style header append.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.head.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.local_expires <= now
    }
}

impl Identity for CacheEntry {
    fn identity(&self) -> i64 {
        self.id
    }
}

/// [`RecordBinding`] for [`CacheEntry`], keyed uniquely by `key`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheEntryBinding;

/// Manager over the `cache_entries` table.
pub type CacheEntries = RecordManager<CacheEntryBinding>;

const UPSERT_SQL: &str = "INSERT INTO cache_entries (key, head, data, local_expires)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(key) DO UPDATE SET
         head = excluded.head,
         data = excluded.data,
         local_expires = excluded.local_expires
     RETURNING id";

impl RecordBinding for CacheEntryBinding {
    type Record = CacheEntry;

    fn table_name(&self) -> &str {
        "cache_entries"
    }

    fn replace(&self, writer: &Handle, record: &CacheEntry) -> Result<i64> {
        if record.key.is_empty() {
            return Err(Error::validation("cache entry key cannot be empty"));
        }
        let head = serde_json::to_string(&record.head)
            .map_err(|e| Error::validation(format!("unserializable headers: {e}")))?;

        writer
            .connection()?
            .query_row(
                UPSERT_SQL,
                rusqlite::params![
                    record.key,
                    head,
                    record.data,
                    record.local_expires.timestamp_millis()
                ],
                |row| row.get(0),
            )
            .map_err(|e| Error::statement(UPSERT_SQL, e))
    }

    fn decode_query(&self, reader: &Handle, sql: &str) -> Result<Vec<CacheEntry>> {
        reader.query_map(sql, from_row)
    }
}

/// Decode a row, tolerating projections that leave columns out.
fn from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let head = match optional::<String>(row, "head")? {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        None => BTreeMap::new(),
    };

    let millis = optional::<i64>(row, "local_expires")?.unwrap_or(0);
    let local_expires = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(0, millis)
    })?;

    Ok(CacheEntry {
        id: optional(row, "id")?.unwrap_or(0),
        key: optional(row, "key")?.unwrap_or_default(),
        head,
        data: optional::<Option<Vec<u8>>>(row, "data")?
            .flatten()
            .unwrap_or_default(),
        local_expires,
    })
}

fn optional<T: FromSql>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>> {
    match row.get::<_, T>(column) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Look up the entry stored under `key`.
pub fn find_by_key(entries: &CacheEntries, key: &str) -> Result<Option<CacheEntry>> {
    let query = SelectQuery::new()
        .filter(format!("key = {}", sql::quote_literal(key)))
        .limit(1);
    Ok(entries.select(&query)?.into_iter().next())
}

/// Remove every entry whose local expiry is at or before `now`.
pub fn delete_expired(entries: &CacheEntries, now: DateTime<Utc>) -> Result<()> {
    entries.delete_where(&format!("local_expires <= {}", now.timestamp_millis()))
}
