//! Database connection management.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::debug;

use crate::error::DbResult;
use crate::statement::Statement;

/// Shared SQLite connection handle.
///
/// Wraps a [`rusqlite::Connection`] behind `Arc<Mutex<_>>` so every
/// statement (root or nested) shares the same handle by reference.
/// This layer never mutates connection state beyond the open-time
/// pragma.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens a database file, enabling WAL journaling.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path.as_ref())?;

        // WAL mode for better concurrent access; the pragma reports
        // the resulting mode as a row
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;

        debug!(path = %path.as_ref().display(), "opened database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Starts a statement on the given table.
    pub fn table(&self, table: impl Into<String>) -> Statement {
        Statement::new(self.conn.clone()).from(table)
    }

    /// Starts a statement with no source configured.
    ///
    /// The source is supplied later via `from` or `from_subquery`.
    pub fn statement(&self) -> Statement {
        Statement::new(self.conn.clone())
    }

    /// Runs raw SQL without parameters, e.g. schema setup.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// The shared connection handle.
    pub fn handle(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}
