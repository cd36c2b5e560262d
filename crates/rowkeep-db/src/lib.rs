//! rowkeep-db: typed record persistence over embedded SQLite.
//!
//! A [`RecordManager`] gives one table a uniform count/select/delete/replace
//! surface. The parts that differ per record type (table name, row decoding,
//! upsert) are supplied by a [`RecordBinding`].
//!
//! # Modules
//!
//! - `store` - the [`Store`] connection capability and [`SqliteStore`]
//! - `handle` - reader/writer [`Handle`]s with idempotent release
//! - `sql` - identifier validation and statement assembly
//! - `manager` - [`RecordManager`] and the [`RecordBinding`] contract
//! - `bindings` - stock bindings for cache entries and dynamic rows
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use rowkeep_db::bindings::cache_entries::{self, CacheEntry, CacheEntryBinding};
//! use rowkeep_db::{RecordManager, SqliteStore};
//!
//! let store = SqliteStore::memory().unwrap();
//! store.initialize(cache_entries::SCHEMA).unwrap();
//! let entries = RecordManager::new(Arc::new(store), CacheEntryBinding).unwrap();
//!
//! let entry = CacheEntry::new("GET /index", b"<html/>".to_vec(), Utc::now() + Duration::hours(1));
//! let id = entries.replace(&entry).unwrap();
//! assert_eq!(entries.count().unwrap(), 1);
//!
//! entries.delete_all().unwrap();
//! assert_eq!(entries.count().unwrap(), 0);
//! # let _ = id;
//! ```

pub mod bindings;
pub mod handle;
pub mod manager;
pub mod sql;
pub mod store;

pub use handle::Handle;
pub use manager::{RecordBinding, RecordManager};
pub use sql::SelectQuery;
pub use store::{SqliteStore, Store};
