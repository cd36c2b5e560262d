//! The generic record manager.
//!
//! [`RecordManager`] owns handle lifecycle and SQL assembly for one table.
//! Everything type-specific lives behind [`RecordBinding`]: the table name,
//! how a query's rows become records, and how a record is upserted.
//!
//! Every public operation opens its own handle, closes it before returning,
//! and reports engine faults as `Err` values rather than panicking.

use std::sync::Arc;

use rowkeep_common::config::{StoreConfig, DEFAULT_ID_COLUMN};
use rowkeep_common::{Error, HandleMode, Identity, Result};

use crate::handle::Handle;
use crate::sql::{self, SelectQuery};
use crate::store::Store;

/// Type-specific behavior a concrete record type supplies.
pub trait RecordBinding: Send + Sync {
    /// The record type stored in this binding's table.
    type Record: Identity;

    /// Table the records live in. Must be a plain identifier.
    fn table_name(&self) -> &str;

    /// Integer identity column of the table. The manager counts and deletes
    /// by this column.
    fn id_column(&self) -> &str {
        DEFAULT_ID_COLUMN
    }

    /// Insert the record, or overwrite the row sharing its unique key, and
    /// return the resulting identity.
    fn replace(&self, writer: &Handle, record: &Self::Record) -> Result<i64>;

    /// Run a fully assembled `SELECT` on `reader` and decode its rows.
    fn decode_query(&self, reader: &Handle, sql: &str) -> Result<Vec<Self::Record>>;
}

/// CRUD surface over one table, generic over its [`RecordBinding`].
pub struct RecordManager<B: RecordBinding> {
    store: Arc<dyn Store>,
    binding: B,
    table: String,
    id_column: String,
    debug_sql: bool,
}

impl<B: RecordBinding> RecordManager<B> {
    /// Create a manager over the binding's table with SQL logging off.
    pub fn new(store: Arc<dyn Store>, binding: B) -> Result<Self> {
        Self::build(store, binding, false)
    }

    /// Create a manager with the SQL logging setting from `config`.
    ///
    /// The identity column always comes from the binding; a configured
    /// `id_column` that names a different column is rejected.
    pub fn from_config(store: Arc<dyn Store>, binding: B, config: &StoreConfig) -> Result<Self> {
        if config.id_column() != binding.id_column() {
            return Err(Error::Config(format!(
                "store.id_column is {:?} but table {} is keyed by {:?}",
                config.id_column(),
                binding.table_name(),
                binding.id_column()
            )));
        }
        Self::build(store, binding, config.debug_sql)
    }

    fn build(store: Arc<dyn Store>, binding: B, debug_sql: bool) -> Result<Self> {
        let table = binding.table_name().to_string();
        let id_column = binding.id_column().to_string();
        sql::validate_identifier(&table)?;
        sql::validate_identifier(&id_column)?;

        Ok(Self {
            store,
            binding,
            table,
            id_column,
            debug_sql,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open a handle for queries.
    ///
    /// A store that cannot be read is misconfigured; the failure is returned
    /// as [`rowkeep_common::Error::StoreUnavailable`] rather than aborting.
    pub fn open_reader(&self) -> Result<Handle> {
        match self.store.open_readable() {
            Ok(conn) => Ok(Handle::new(conn, HandleMode::Reader)),
            Err(e) => {
                tracing::error!(table = %self.table, "Reader unavailable: {e}");
                Err(e)
            }
        }
    }

    /// Open a handle for mutation.
    pub fn open_writer(&self) -> Result<Handle> {
        match self.store.open_writable() {
            Ok(conn) => Ok(Handle::new(conn, HandleMode::Writer)),
            Err(e) => {
                tracing::warn!(table = %self.table, "Writer unavailable: {e}");
                Err(e)
            }
        }
    }

    /// Release a reader handle. Safe on an already-closed handle.
    pub fn close_reader(&self, mut handle: Handle) {
        handle.close();
    }

    /// Release a writer handle. Safe on an already-closed handle.
    pub fn close_writer(&self, mut handle: Handle) {
        handle.close();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Number of rows with a non-null identity.
    pub fn count(&self) -> Result<i64> {
        self.count_column(&self.id_column)
    }

    /// `SELECT COUNT(<column>)` over the table. An empty result is 0.
    pub fn count_column(&self, column: &str) -> Result<i64> {
        sql::validate_column(column)?;
        self.count_sql(&sql::count_sql(&self.table, column))
    }

    /// Run a caller-written aggregate and read the first column of its first
    /// row. No rows, or a NULL, is 0.
    ///
    /// The text runs as given, like a predicate.
    pub fn count_sql(&self, sql: &str) -> Result<i64> {
        if sql::is_blank(Some(sql)) {
            return Err(Error::validation("count statement is empty"));
        }
        self.trace(sql);

        let reader = self.open_reader()?;
        let count = reader.query_first_i64(sql);
        self.close_reader(reader);
        Ok(count?.unwrap_or(0))
    }

    /// The exact statement [`RecordManager::select`] would run.
    pub fn select_sql(&self, query: &SelectQuery) -> Result<String> {
        query.to_sql(&self.table)
    }

    /// Run a `SELECT` and decode the rows through the binding.
    pub fn select(&self, query: &SelectQuery) -> Result<Vec<B::Record>> {
        let sql = self.select_sql(query)?;
        self.trace(&sql);

        let reader = self.open_reader()?;
        let records = self.binding.decode_query(&reader, &sql);
        self.close_reader(reader);
        records
    }

    /// Run a caller-written `SELECT` (joins, subqueries) and decode its rows
    /// through the binding.
    pub fn query(&self, sql: &str) -> Result<Vec<B::Record>> {
        if sql::is_blank(Some(sql)) {
            return Err(Error::validation("query statement is empty"));
        }
        self.trace(sql);

        let reader = self.open_reader()?;
        let records = self.binding.decode_query(&reader, sql);
        self.close_reader(reader);
        records
    }

    /// Every row, every column.
    pub fn get_all(&self) -> Result<Vec<B::Record>> {
        self.select(&SelectQuery::new())
    }

    /// Every row, projected onto `columns`.
    pub fn get_all_columns(&self, columns: &str) -> Result<Vec<B::Record>> {
        self.select(&SelectQuery::new().columns(columns))
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Upsert `record` through the binding and return its identity.
    pub fn replace(&self, record: &B::Record) -> Result<i64> {
        let writer = self.open_writer()?;
        let result = self.binding.replace(&writer, record);
        self.close_writer(writer);

        if let Err(e) = &result {
            tracing::warn!(table = %self.table, "Replace failed: {e}");
        }
        result
    }

    /// Remove every row. The table itself is kept.
    pub fn delete_all(&self) -> Result<()> {
        self.delete_where("1=1")
    }

    /// Remove the rows of the given records.
    ///
    /// Records with identity `<= 0` were never stored and are skipped; if none
    /// remain this is a successful no-op.
    pub fn delete<R: Identity>(&self, records: &[R]) -> Result<()> {
        match sql::identity_predicate(&self.id_column, records.iter().map(Identity::identity)) {
            Some(predicate) => self.delete_where(&predicate),
            None => Ok(()),
        }
    }

    /// `DELETE FROM <table> WHERE <predicate>`.
    ///
    /// The predicate is trusted text and is concatenated verbatim. A blank
    /// predicate deletes nothing and succeeds without opening the store.
    pub fn delete_where(&self, predicate: &str) -> Result<()> {
        if sql::is_blank(Some(predicate)) {
            return Ok(());
        }

        let writer = self.open_writer()?;
        let sql = sql::delete_sql(&self.table, predicate);
        self.trace(&sql);

        let result = writer.execute(&sql);
        self.close_writer(writer);

        match result {
            Ok(removed) => {
                tracing::debug!(table = %self.table, removed, "Deleted rows");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(table = %self.table, "Delete failed: {e}");
                Err(e)
            }
        }
    }

    fn trace(&self, sql: &str) {
        if self.debug_sql {
            tracing::debug!(table = %self.table, "{sql}");
        }
    }
}

impl<B: RecordBinding + std::fmt::Debug> std::fmt::Debug for RecordManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordManager")
            .field("binding", &self.binding)
            .field("table", &self.table)
            .field("id_column", &self.id_column)
            .field("debug_sql", &self.debug_sql)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::bindings::DynamicBinding;
    use rowkeep_common::ErrorKind;
    use rusqlite::Connection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: i64,
        name: String,
    }

    impl Identity for Widget {
        fn identity(&self) -> i64 {
            self.id
        }
    }

    fn rec(id: i64) -> Widget {
        Widget {
            id,
            name: format!("w{id}"),
        }
    }

    #[derive(Debug)]
    struct WidgetBinding;

    impl RecordBinding for WidgetBinding {
        type Record = Widget;

        fn table_name(&self) -> &str {
            "widgets"
        }

        fn replace(&self, writer: &Handle, record: &Widget) -> Result<i64> {
            let sql = "INSERT INTO widgets (name) VALUES (?1)
                       ON CONFLICT(name) DO UPDATE SET name = excluded.name
                       RETURNING id";
            writer
                .connection()?
                .query_row(sql, [&record.name], |row| row.get(0))
                .map_err(|e| Error::statement(sql, e))
        }

        fn decode_query(&self, reader: &Handle, sql: &str) -> Result<Vec<Widget>> {
            reader.query_map(sql, |row| {
                Ok(Widget {
                    id: row.get("id")?,
                    name: row.get("name")?,
                })
            })
        }
    }

    const SCHEMA: &str =
        "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);";

    fn manager() -> RecordManager<WidgetBinding> {
        let store = SqliteStore::memory().unwrap();
        store.initialize(SCHEMA).unwrap();
        RecordManager::new(Arc::new(store), WidgetBinding).unwrap()
    }

    fn seeded(n: i64) -> RecordManager<WidgetBinding> {
        let manager = manager();
        for id in 1..=n {
            manager.replace(&rec(id)).unwrap();
        }
        manager
    }

    /// Counts opened connections and can refuse writers.
    struct CountingStore {
        inner: SqliteStore,
        writable: bool,
        opened: AtomicUsize,
    }

    impl CountingStore {
        fn new(writable: bool) -> Self {
            let inner = SqliteStore::memory().unwrap();
            inner.initialize(SCHEMA).unwrap();
            Self {
                inner,
                writable,
                opened: AtomicUsize::new(0),
            }
        }
    }

    impl Store for CountingStore {
        fn open_readable(&self) -> Result<Connection> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.inner.open_readable()
        }

        fn open_writable(&self) -> Result<Connection> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.writable {
                self.inner.open_writable()
            } else {
                Err(Error::store_unavailable(
                    HandleMode::Writer,
                    "unable to open database file",
                ))
            }
        }
    }

    #[test]
    fn rejects_bad_identifiers() {
        #[derive(Debug)]
        struct BadTable;
        impl RecordBinding for BadTable {
            type Record = i64;
            fn table_name(&self) -> &str {
                "widgets; DROP TABLE widgets"
            }
            fn replace(&self, _: &Handle, _: &i64) -> Result<i64> {
                unreachable!()
            }
            fn decode_query(&self, _: &Handle, _: &str) -> Result<Vec<i64>> {
                unreachable!()
            }
        }

        #[derive(Debug)]
        struct BadIdColumn;
        impl RecordBinding for BadIdColumn {
            type Record = i64;
            fn table_name(&self) -> &str {
                "widgets"
            }
            fn id_column(&self) -> &str {
                "row id"
            }
            fn replace(&self, _: &Handle, _: &i64) -> Result<i64> {
                unreachable!()
            }
            fn decode_query(&self, _: &Handle, _: &str) -> Result<Vec<i64>> {
                unreachable!()
            }
        }

        let store: Arc<dyn Store> = Arc::new(SqliteStore::memory().unwrap());
        let err = RecordManager::new(store.clone(), BadTable).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = RecordManager::new(store, BadIdColumn).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[test]
    fn identity_column_comes_from_binding() {
        let store = SqliteStore::memory().unwrap();
        store
            .initialize("CREATE TABLE parts (pk INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();
        let binding = DynamicBinding::new("parts", "pk").unwrap();
        let manager = RecordManager::new(Arc::new(store), binding).unwrap();
        assert_eq!(manager.id_column(), "pk");

        let mut row = crate::bindings::DynamicRow::default();
        row.columns.insert("name".into(), serde_json::json!("gear"));
        row.id = manager.replace(&row).unwrap();
        assert_eq!(row.id, 1);

        assert_eq!(manager.count().unwrap(), 1);
        manager.delete(&[row]).unwrap();
        assert_eq!(manager.count().unwrap(), 0);
    }

    #[test]
    fn config_identity_column_must_match_binding() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::memory().unwrap());
        let mut config = StoreConfig::memory();
        config.id_column = "_id".into();

        let err = RecordManager::from_config(store.clone(), WidgetBinding, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let binding = DynamicBinding::new("widgets", "_id").unwrap();
        let manager = RecordManager::from_config(store, binding, &config).unwrap();
        assert_eq!(manager.id_column(), "_id");
    }

    #[test]
    fn count_empty_and_populated() {
        assert_eq!(manager().count_column("id").unwrap(), 0);
        assert_eq!(manager().count().unwrap(), 0);

        let manager = seeded(5);
        assert_eq!(manager.count_column("id").unwrap(), 5);
        assert_eq!(manager.count_column("*").unwrap(), 5);
        assert_eq!(manager.count_column("name").unwrap(), 5);
    }

    #[test]
    fn count_rejects_expression_columns() {
        let err = manager().count_column("id) FROM widgets --").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn count_unknown_column_is_statement_fault() {
        let err = manager().count_column("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatementFault);
    }

    #[test]
    fn delete_mixed_identities() {
        let manager = seeded(3);
        manager.delete(&[rec(1), rec(-1), rec(3)]).unwrap();

        let remaining = manager.get_all().unwrap();
        assert_eq!(remaining, vec![rec(2)]);
        assert_eq!(manager.count().unwrap(), 1);
    }

    #[test]
    fn delete_unpersisted_only_is_noop() {
        let store = Arc::new(CountingStore::new(false));
        let manager = RecordManager::new(store.clone(), WidgetBinding).unwrap();

        manager.delete(&[rec(0), rec(-4)]).unwrap();
        manager.delete::<Widget>(&[]).unwrap();
        assert_eq!(store.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blank_predicate_never_touches_store() {
        let store = Arc::new(CountingStore::new(false));
        let manager = RecordManager::new(store.clone(), WidgetBinding).unwrap();

        manager.delete_where("").unwrap();
        manager.delete_where("   ").unwrap();
        assert_eq!(store.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn delete_without_matches_succeeds() {
        let manager = seeded(2);
        manager.delete_where("id > 100").unwrap();
        assert_eq!(manager.count().unwrap(), 2);
    }

    #[test]
    fn delete_all_then_count() {
        let manager = seeded(4);
        manager.delete_all().unwrap();
        assert_eq!(manager.count().unwrap(), 0);
        assert!(manager.get_all().unwrap().is_empty());
    }

    #[test]
    fn malformed_predicate_is_statement_fault() {
        let manager = seeded(2);
        let err = manager.delete_where("id IN (").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatementFault);
        // the writer was released; the store is still usable
        assert_eq!(manager.count().unwrap(), 2);
        manager.delete_all().unwrap();
    }

    #[test]
    fn predicate_text_is_trusted() {
        let manager = seeded(3);
        manager.delete_where("id = 2 OR 1=1").unwrap();
        assert_eq!(manager.count().unwrap(), 0);
    }

    #[test]
    fn unavailable_writer_fails_mutations() {
        let store = Arc::new(CountingStore::new(false));
        let manager = RecordManager::new(store, WidgetBinding).unwrap();

        let err = manager.delete_where("1=1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(manager.delete_all().is_err());
        assert!(manager.delete(&[rec(1)]).is_err());
        assert!(matches!(
            manager.replace(&rec(1)).unwrap_err(),
            Error::StoreUnavailable {
                mode: HandleMode::Writer,
                ..
            }
        ));
        assert!(manager.open_writer().is_err());

        // reads are unaffected
        assert_eq!(manager.count().unwrap(), 0);
    }

    #[test]
    fn replace_round_trip() {
        let manager = manager();
        let id = manager.replace(&rec(0)).unwrap();
        assert!(id > 0);

        let all = manager.get_all().unwrap();
        assert!(all.iter().any(|w| w.id == id));
    }

    #[test]
    fn replace_existing_key_keeps_identity() {
        let manager = manager();
        let first = manager.replace(&rec(7)).unwrap();
        let second = manager.replace(&rec(7)).unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.count().unwrap(), 1);
    }

    #[test]
    fn select_with_clauses() {
        let manager = seeded(5);
        let query = SelectQuery::new()
            .filter("id > 1")
            .order_by("id DESC")
            .limit(2)
            .offset(1);
        let ids: Vec<i64> = manager.select(&query).unwrap().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[test]
    fn select_offset_without_limit_is_dropped() {
        let manager = seeded(3);
        let query = SelectQuery::new().offset(2);
        assert_eq!(manager.select_sql(&query).unwrap(), "SELECT * FROM widgets");
        assert_eq!(manager.select(&query).unwrap().len(), 3);
    }

    #[test]
    fn get_all_columns_projects() {
        let manager = seeded(2);
        let rows = manager.get_all_columns("id, name").unwrap();
        assert_eq!(rows.len(), 2);

        let err = manager.get_all_columns("id").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatementFault);
    }

    #[test]
    fn explicit_close_is_safe_twice() {
        let manager = manager();
        let mut reader = manager.open_reader().unwrap();
        assert_eq!(reader.mode(), HandleMode::Reader);
        reader.close();
        manager.close_reader(reader);

        let writer = manager.open_writer().unwrap();
        assert_eq!(writer.mode(), HandleMode::Writer);
        manager.close_writer(writer);
    }

    #[test]
    fn debug_sql_config_is_accepted() {
        let store = SqliteStore::memory().unwrap();
        store.initialize(SCHEMA).unwrap();
        let config = StoreConfig::memory().with_debug_sql(true);
        let manager = RecordManager::from_config(Arc::new(store), WidgetBinding, &config).unwrap();

        assert_eq!(manager.table(), "widgets");
        assert_eq!(manager.id_column(), "id");
        assert_eq!(manager.count().unwrap(), 0);
    }

    #[test]
    fn count_with_custom_sql() {
        let manager = seeded(5);
        assert_eq!(
            manager
                .count_sql("SELECT COUNT(*) FROM widgets WHERE id % 2 = 1")
                .unwrap(),
            3
        );
        assert_eq!(manager.count_sql("SELECT MAX(id) FROM widgets WHERE id > 9").unwrap(), 0);
        assert_eq!(
            manager.count_sql("SELECT id FROM widgets WHERE 0").unwrap(),
            0
        );

        let err = manager.count_sql("SELECT COUNT(*) FROM nowhere").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatementFault);
        assert_eq!(manager.count_sql("  ").unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn query_with_custom_sql() {
        let manager = seeded(4);
        let rows = manager
            .query("SELECT w.id, w.name FROM widgets w WHERE w.id IN (SELECT MAX(id) FROM widgets)")
            .unwrap();
        assert_eq!(rows, vec![rec(4)]);

        let err = manager.query("SELECT id FROM widgets").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatementFault);
        assert_eq!(manager.query("").unwrap_err().kind(), ErrorKind::InvalidInput);

        // the reader was released each time
        manager.delete_all().unwrap();
        assert!(manager.query("SELECT * FROM widgets").unwrap().is_empty());
    }

    #[test]
    fn custom_sql_needs_a_readable_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::file(dir.path().join("absent.db"));
        let manager = RecordManager::new(Arc::new(store), WidgetBinding).unwrap();

        let err = manager.count_sql("SELECT COUNT(*) FROM widgets").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        let err = manager.query("SELECT * FROM widgets").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    #[test]
    fn oversized_limit_runs() {
        let manager = seeded(3);
        let query = SelectQuery::new().limit(u64::MAX).offset(1);
        assert_eq!(manager.select(&query).unwrap().len(), 2);
    }
}
