//! Schema-less rows for tables known only at runtime.
//!
//! A [`DynamicRow`] maps column names to JSON values. It is what the
//! `rowkeep` command-line tool reads and writes.

use std::collections::BTreeMap;

use rowkeep_common::{Error, Identity, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Row;
use serde_json::{Map, Number, Value};

use crate::handle::Handle;
use crate::manager::RecordBinding;
use crate::sql;

/// A row of an arbitrary table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRow {
    /// Identity column value, or 0 when absent.
    pub id: i64,
    /// Every other column. The identity column is never stored here.
    pub columns: BTreeMap<String, Value>,
}

impl DynamicRow {
    /// Build a row from a JSON object, lifting the identity column out.
    pub fn from_json(value: Value, id_column: &str) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::validation("row must be a JSON object"));
        };

        let mut row = DynamicRow::default();
        for (name, value) in map {
            if name == id_column {
                row.id = match &value {
                    Value::Null => 0,
                    Value::Number(n) => n.as_i64().ok_or_else(|| {
                        Error::validation(format!("{id_column} must be an integer"))
                    })?,
                    _ => return Err(Error::validation(format!("{id_column} must be an integer"))),
                };
            } else {
                row.columns.insert(name, value);
            }
        }
        Ok(row)
    }

    /// The row as one JSON object, identity included when set.
    pub fn to_json(&self, id_column: &str) -> Value {
        let mut map: Map<String, Value> = self
            .columns
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if self.id > 0 {
            map.insert(id_column.to_string(), Value::from(self.id));
        }
        Value::Object(map)
    }
}

impl Identity for DynamicRow {
    fn identity(&self) -> i64 {
        self.id
    }
}

/// [`RecordBinding`] for any table with an integer identity column.
///
/// Upserts use `INSERT OR REPLACE`, so any unique constraint on the table
/// decides which existing row is overwritten.
#[derive(Debug, Clone)]
pub struct DynamicBinding {
    table: String,
    id_column: String,
}

impl DynamicBinding {
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Result<Self> {
        let binding = Self {
            table: table.into(),
            id_column: id_column.into(),
        };
        sql::validate_identifier(&binding.table)?;
        sql::validate_identifier(&binding.id_column)?;
        Ok(binding)
    }

    fn from_row(&self, row: &Row<'_>) -> rusqlite::Result<DynamicRow> {
        let mut out = DynamicRow::default();
        let names: Vec<String> = row
            .as_ref()
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        for (idx, name) in names.into_iter().enumerate() {
            let value = row.get_ref(idx)?;
            if name == self.id_column {
                if let ValueRef::Integer(id) = value {
                    out.id = id;
                }
                continue;
            }
            out.columns.insert(name, to_json(value));
        }
        Ok(out)
    }
}

impl RecordBinding for DynamicBinding {
    type Record = DynamicRow;

    fn table_name(&self) -> &str {
        &self.table
    }

    fn id_column(&self) -> &str {
        &self.id_column
    }

    fn replace(&self, writer: &Handle, record: &DynamicRow) -> Result<i64> {
        let mut names = Vec::with_capacity(record.columns.len() + 1);
        let mut values = Vec::with_capacity(record.columns.len() + 1);

        if record.id > 0 {
            names.push(self.id_column.as_str());
            values.push(SqlValue::Integer(record.id));
        }
        for (name, value) in &record.columns {
            sql::validate_identifier(name)?;
            names.push(name.as_str());
            values.push(to_sql(value));
        }

        let statement = if names.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else {
            let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
                self.table,
                names.join(", "),
                placeholders.join(", ")
            )
        };

        writer.execute_with(&statement, rusqlite::params_from_iter(values.iter()))?;
        Ok(writer.connection()?.last_insert_rowid())
    }

    fn decode_query(&self, reader: &Handle, sql: &str) -> Result<Vec<DynamicRow>> {
        reader.query_map(sql, |row| self.from_row(row))
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
