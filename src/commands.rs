//! Table commands backing the `rowkeep` binary.
//!
//! Each command opens nothing itself: the [`RecordManager`] passed in opens
//! and releases a handle per operation.

use anyhow::{Context, Result};
use rowkeep_common::config::StoreConfig;
use rowkeep_db::bindings::{DynamicBinding, DynamicRow};
use rowkeep_db::{RecordManager, SelectQuery, SqliteStore, Store};
use std::io::Write;
use std::sync::Arc;

/// Manager over an arbitrary table.
pub type TableManager = RecordManager<DynamicBinding>;

/// Open `table` on the store described by `config`.
pub fn open_table(config: &StoreConfig, table: &str) -> Result<TableManager> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(config)?);
    let binding = DynamicBinding::new(table, config.id_column())?;
    let manager = RecordManager::from_config(store, binding, config)
        .with_context(|| format!("Cannot manage table {table:?}"))?;
    Ok(manager)
}

pub fn count(manager: &TableManager, column: Option<&str>, out: &mut impl Write) -> Result<()> {
    let n = match column {
        Some(column) => manager.count_column(column)?,
        None => manager.count()?,
    };
    writeln!(out, "{n}")?;
    Ok(())
}

/// Print every selected row as one JSON object per line.
pub fn select(manager: &TableManager, query: &SelectQuery, out: &mut impl Write) -> Result<()> {
    let id_column = manager.id_column();
    for row in manager.select(query)? {
        writeln!(out, "{}", row.to_json(id_column))?;
    }
    Ok(())
}

pub fn select_sql(manager: &TableManager, query: &SelectQuery, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", manager.select_sql(query)?)?;
    Ok(())
}

pub fn delete_where(manager: &TableManager, predicate: &str) -> Result<()> {
    manager
        .delete_where(predicate)
        .with_context(|| format!("Delete from {} failed", manager.table()))
}

pub fn delete_ids(manager: &TableManager, ids: &[i64]) -> Result<()> {
    manager
        .delete(ids)
        .with_context(|| format!("Delete from {} failed", manager.table()))
}

pub fn truncate(manager: &TableManager) -> Result<()> {
    manager
        .delete_all()
        .with_context(|| format!("Truncate of {} failed", manager.table()))
}

/// Upsert a row from JSON and print the resulting identity.
pub fn put(manager: &TableManager, json: &str, out: &mut impl Write) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(json).context("Row is not valid JSON")?;
    let row = DynamicRow::from_json(value, manager.id_column())?;
    let id = manager.replace(&row)?;
    writeln!(out, "{id}")?;
    Ok(())
}
