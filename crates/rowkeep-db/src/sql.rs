//! SQL text assembly for count, select, and delete statements.
//!
//! Identifiers (table names, the identity column, counted and selected
//! columns) are validated before they are spliced into statement text.
//! Predicates and `ORDER BY` text are NOT validated: they are concatenated
//! verbatim and must come from trusted code, never from end users. A
//! predicate such as `id = 2 OR 1=1` widens the statement exactly as written.

use rowkeep_common::{Error, Result};

/// Validate a SQL identifier (table or column name).
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]{0,254}`; anything else, including quoting
/// and whitespace, is rejected.
///
/// # Examples
///
/// ```
/// use rowkeep_db::sql::validate_identifier;
///
/// assert!(validate_identifier("cache_entries").is_ok());
/// assert!(validate_identifier("_id").is_ok());
/// assert!(validate_identifier("x; DROP TABLE users--").is_err());
/// assert!(validate_identifier("").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier("identifier cannot be empty".into()));
    }

    if name.len() > 255 {
        return Err(Error::InvalidIdentifier(format!(
            "identifier too long: {} chars (max 255)",
            name.len()
        )));
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => {
            return Err(Error::InvalidIdentifier(format!(
                "'{name}' must start with a letter or underscore"
            )));
        }
    }

    if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(Error::InvalidIdentifier(format!(
            "'{name}' contains invalid character '{c}'"
        )));
    }

    Ok(())
}

/// Validate a column reference for `COUNT(..)`: `*` or an identifier.
pub fn validate_column(name: &str) -> Result<()> {
    if name == "*" {
        return Ok(());
    }
    validate_identifier(name)
}

/// Normalize a comma-separated projection list.
///
/// A blank list means every column. Each entry must be `*` or an identifier;
/// surrounding whitespace is dropped.
pub fn normalize_columns(columns: &str) -> Result<String> {
    if is_blank(Some(columns)) {
        return Ok("*".to_string());
    }

    let mut parts = Vec::new();
    for part in columns.split(',') {
        let part = part.trim();
        validate_column(part)?;
        parts.push(part);
    }
    Ok(parts.join(", "))
}

/// True for `None`, the empty string, or whitespace only.
pub fn is_blank(text: Option<&str>) -> bool {
    text.map_or(true, |t| t.trim().is_empty())
}

/// Quote a string as a SQL literal, doubling embedded single quotes.
///
/// For building trusted predicates from values; bound parameters remain the
/// better choice wherever the statement shape allows them.
///
/// ```
/// use rowkeep_db::sql::quote_literal;
///
/// assert_eq!(quote_literal("users"), "'users'");
/// assert_eq!(quote_literal("don't"), "'don''t'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `SELECT COUNT(<column>) FROM <table>`
pub fn count_sql(table: &str, column: &str) -> String {
    format!("SELECT COUNT({column}) FROM {table}")
}

/// `DELETE FROM <table> WHERE <predicate>`
pub fn delete_sql(table: &str, predicate: &str) -> String {
    format!("DELETE FROM {table} WHERE {predicate}")
}

/// Build `<id_column> IN (a,b,..)` over the positive identities.
///
/// Identities `<= 0` belong to records that were never stored and are
/// skipped. Returns `None` when nothing is left, so callers never emit an
/// empty `IN ()` list.
pub fn identity_predicate(id_column: &str, ids: impl IntoIterator<Item = i64>) -> Option<String> {
    let ids: Vec<String> = ids
        .into_iter()
        .filter(|id| *id > 0)
        .map(|id| id.to_string())
        .collect();

    if ids.is_empty() {
        return None;
    }
    Some(format!("{id_column} IN ({})", ids.join(",")))
}

/// Parameters of a `SELECT` against a manager's table.
///
/// `offset` only takes effect together with `limit`; an offset on its own is
/// dropped from the generated text. Both are capped at `i64::MAX`, the
/// largest value the engine accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    pub columns: String,
    pub predicate: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// Every column, no filtering.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Trusted predicate text placed after `WHERE`.
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Trusted ordering text placed after `ORDER BY`.
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Assemble the statement for `table`.
    ///
    /// ```
    /// use rowkeep_db::sql::SelectQuery;
    ///
    /// let sql = SelectQuery::new()
    ///     .columns("id, key")
    ///     .filter("local_expires > 0")
    ///     .order_by("id DESC")
    ///     .limit(20)
    ///     .offset(40)
    ///     .to_sql("cache_entries")
    ///     .unwrap();
    /// assert_eq!(
    ///     sql,
    ///     "SELECT id, key FROM cache_entries WHERE local_expires > 0 \
    ///      ORDER BY id DESC LIMIT 20 OFFSET 40"
    /// );
    /// ```
    pub fn to_sql(&self, table: &str) -> Result<String> {
        let mut sql = format!("SELECT {} FROM {table}", normalize_columns(&self.columns)?);

        if let Some(predicate) = self.predicate.as_deref().filter(|p| !p.trim().is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        if let Some(order_by) = self.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", clamp_i64(limit)));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {}", clamp_i64(offset)));
            }
        }

        Ok(sql)
    }
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
