//! The storage engine capability and its SQLite implementation.
//!
//! A [`Store`] hands out fresh connections; it never pools or caches them.
//! Every connection is owned by the operation that asked for it and closed
//! before that operation returns.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rowkeep_common::config::StoreConfig;
use rowkeep_common::{Error, HandleMode, Result};
use rusqlite::{Connection, OpenFlags};

/// Source of connections to the embedded store.
pub trait Store: Send + Sync {
    /// Open a connection that can only run queries.
    fn open_readable(&self) -> Result<Connection>;

    /// Open a connection that may modify the store, creating it if needed.
    fn open_writable(&self) -> Result<Connection>;
}

#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Memory(String),
}

/// SQLite-backed [`Store`], either a file on disk or a private in-memory
/// database.
///
/// In-memory stores use a uniquely named shared-cache URI so that every
/// connection opened by the same store sees the same data. An anchor
/// connection keeps the database alive for the store's lifetime; it is never
/// handed out.
pub struct SqliteStore {
    target: Target,
    busy_timeout: Duration,
    _anchor: Option<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a store from configuration.
    ///
    /// File stores open nothing up front. In-memory stores open the anchor
    /// connection immediately.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        match &config.path {
            Some(path) => Ok(Self::file_with_timeout(path, busy_timeout)),
            None => Self::memory_with_timeout(busy_timeout),
        }
    }

    /// A store backed by the SQLite file at `path`.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::file_with_timeout(path, Duration::from_millis(StoreConfig::default().busy_timeout_ms))
    }

    /// A private in-memory store (useful for tests).
    pub fn memory() -> Result<Self> {
        Self::memory_with_timeout(Duration::from_millis(StoreConfig::default().busy_timeout_ms))
    }

    fn file_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Self {
        let path = path.as_ref().to_path_buf();
        tracing::info!("Using SQLite store at {}", path.display());
        Self {
            target: Target::File(path),
            busy_timeout,
            _anchor: None,
        }
    }

    fn memory_with_timeout(busy_timeout: Duration) -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:rowkeep_mem_{}_{n}?mode=memory&cache=shared", std::process::id());

        let anchor = Connection::open_with_flags(&uri, writer_flags())
            .map_err(|e| Error::store_unavailable(HandleMode::Writer, e))?;
        tracing::debug!("Opened in-memory store {uri}");

        Ok(Self {
            target: Target::Memory(uri),
            busy_timeout,
            _anchor: Some(Mutex::new(anchor)),
        })
    }

    /// The database file, if this store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            Target::File(path) => Some(path),
            Target::Memory(_) => None,
        }
    }

    /// Run a DDL batch (e.g. `CREATE TABLE IF NOT EXISTS ..`) on a writer.
    ///
    /// This is application bootstrap, not schema migration: the batch runs
    /// as given, every time it is called.
    pub fn initialize(&self, ddl: &str) -> Result<()> {
        let conn = self.open_writable()?;
        let result = conn
            .execute_batch(ddl)
            .map_err(|e| Error::statement(ddl.trim(), e));
        if let Err((_, e)) = conn.close() {
            tracing::warn!("Failed to close writer after initialize: {e}");
        }
        result
    }

    fn configure(&self, conn: &Connection, mode: HandleMode) -> Result<()> {
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| Error::store_unavailable(mode, e))?;
        if !mode.is_writable() && matches!(self.target, Target::Memory(_)) {
            conn.execute_batch("PRAGMA query_only = ON;")
                .map_err(|e| Error::store_unavailable(mode, e))?;
        }
        Ok(())
    }

    fn open(&self, mode: HandleMode) -> Result<Connection> {
        let (location, flags) = match &self.target {
            Target::File(path) if mode.is_writable() => (path.to_string_lossy(), writer_flags()),
            Target::File(path) => (path.to_string_lossy(), reader_flags()),
            Target::Memory(uri) if mode.is_writable() => (uri.as_str().into(), writer_flags()),
            // Shared-cache memory readers are made read-only by query_only.
            Target::Memory(uri) => (
                uri.as_str().into(),
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
        };

        let conn = Connection::open_with_flags(&*location, flags)
            .map_err(|e| Error::store_unavailable(mode, e))?;
        self.configure(&conn, mode)?;
        Ok(conn)
    }
}

impl Store for SqliteStore {
    fn open_readable(&self) -> Result<Connection> {
        self.open(HandleMode::Reader)
    }

    fn open_writable(&self) -> Result<Connection> {
        self.open(HandleMode::Writer)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("target", &self.target)
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

fn reader_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn writer_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
}
