//! Store handles.
//!
//! A [`Handle`] owns exactly one connection, opened in reader or writer mode.
//! Result cursors (`rusqlite::Rows`) borrow the handle, so a cursor can never
//! be used once its handle is gone.

use rowkeep_common::{Error, HandleMode, Result};
use rusqlite::{Connection, Params, Row};

/// An open connection owned by a single operation.
///
/// [`Handle::close`] is idempotent. A handle that is dropped while still
/// open is closed on drop.
#[derive(Debug)]
pub struct Handle {
    conn: Option<Connection>,
    mode: HandleMode,
}

impl Handle {
    pub(crate) fn new(conn: Connection, mode: HandleMode) -> Self {
        Self {
            conn: Some(conn),
            mode,
        }
    }

    /// The mode this handle was opened in.
    pub fn mode(&self) -> HandleMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Borrow the underlying connection, for bindings that need bound
    /// parameters or `RETURNING` clauses.
    pub fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::store_unavailable(self.mode, "handle is closed"))
    }

    /// Execute a single statement without parameters.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.execute_with(sql, [])
    }

    /// Execute a single statement with bound parameters.
    pub fn execute_with<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.connection()?
            .execute(sql, params)
            .map_err(|e| Error::statement(sql, e))
    }

    /// Run `sql` and return the first column of the first row as an integer.
    ///
    /// `Ok(None)` when the result set is empty or the value is NULL.
    pub fn query_first_i64(&self, sql: &str) -> Result<Option<i64>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(|e| Error::statement(sql, e))?;
        let mut cursor = stmt.query([]).map_err(|e| Error::statement(sql, e))?;

        let value = match cursor.next().map_err(|e| Error::statement(sql, e))? {
            Some(row) => row
                .get::<_, Option<i64>>(0)
                .map_err(|e| Error::statement(sql, e))?,
            None => None,
        };
        Ok(value)
    }

    /// Run `sql` and map every row with `f`, in result order.
    pub fn query_map<T, F>(&self, sql: &str, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(|e| Error::statement(sql, e))?;
        let mut cursor = stmt.query([]).map_err(|e| Error::statement(sql, e))?;

        let mut out = Vec::new();
        while let Some(row) = cursor.next().map_err(|e| Error::statement(sql, e))? {
            out.push(f(row).map_err(|e| Error::statement(sql, e))?);
        }
        Ok(out)
    }

    /// Release the connection. Closing a closed handle does nothing.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!("Failed to close {} handle: {e}", self.mode);
            }
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}
