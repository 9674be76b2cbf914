//! Terminal operations: bind the compiled SQL and run it.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, ToSql};
use tracing::{debug, trace};

use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::value::Value;

use super::Statement;

const MORPH_BATCH_SIZE: u64 = 100;

fn read_row(columns: &Arc<[String]>, row: &rusqlite::Row) -> rusqlite::Result<Row> {
    let mut values = Vec::with_capacity(columns.len());
    for idx in 0..columns.len() {
        values.push(Value::from(row.get_ref(idx)?));
    }
    Ok(Row::new(columns.clone(), values))
}

fn query_rows(conn: &Connection, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Arc<[String]> = stmt
        .column_names()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .into();

    let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let mut rows = stmt.query(params_ref.as_slice())?;

    let mut out = vec![];
    while let Some(row) = rows.next()? {
        out.push(read_row(&columns, row)?);
    }
    Ok(out)
}

impl Statement {
    /// Executes the SELECT and returns every row.
    pub fn get(self) -> DbResult<Vec<Row>> {
        let sql = self.compile_select()?;
        let params = self.ordered_bindings();
        debug!(sql = %sql, params = params.len(), "executing select");

        let conn = self.db.lock()?;
        query_rows(&conn, &sql, &params)
    }

    /// Executes with `LIMIT 1` and returns the row, if any.
    pub fn first(mut self) -> DbResult<Option<Row>> {
        self.limit = Some(1);
        Ok(self.get()?.into_iter().next())
    }

    /// Counts the rows the SELECT would return.
    pub fn count(self) -> DbResult<u64> {
        let inner = self.compile_select()?;
        let sql = format!("SELECT COUNT(*) FROM ({})", inner);
        let params = self.ordered_bindings();
        debug!(sql = %sql, params = params.len(), "executing count");

        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        let count = stmt.query_row(params_ref.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Lazily executes the SELECT, applying `transform` to each row.
    ///
    /// Nothing runs until the first `next()`. The iterator is
    /// forward-only and non-restartable; dropping it releases the
    /// driver-side statement.
    pub fn morph<T, F>(self, transform: F) -> MorphIter<T>
    where
        F: FnMut(Row) -> T + 'static,
    {
        self.into_morph(Transform::Row(Box::new(transform)))
    }

    /// Like [`morph`](Self::morph), but passes the row's values
    /// positionally instead of the whole row mapping.
    pub fn morph_spread<T, F>(self, transform: F) -> MorphIter<T>
    where
        F: FnMut(&[Value]) -> T + 'static,
    {
        self.into_morph(Transform::Spread(Box::new(transform)))
    }

    fn into_morph<T>(self, transform: Transform<T>) -> MorphIter<T> {
        let (sql, pending_err) = match self.compile_select() {
            Ok(sql) => (sql, None),
            Err(err) => (String::new(), Some(err)),
        };
        MorphIter {
            db: self.db.clone(),
            sql,
            params: self.ordered_bindings(),
            transform,
            buffer: vec![],
            buffer_index: 0,
            fetched: 0,
            done: false,
            pending_err,
        }
    }

    /// Inserts one row and returns the generated rowid.
    ///
    /// Values bind in the mapping's iteration order. Fails with
    /// `TableNotSet` without a table source, `EmptyValues` on an
    /// empty mapping; neither reaches the driver.
    pub fn insert<I, K, V>(self, data: I) -> DbResult<i64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.check_misuse()?;
        let table = match &self.source {
            Some(source) => source.table_name()?.to_string(),
            None => return Err(DbError::TableNotSet),
        };

        let mut columns = vec![];
        let mut params = vec![];
        for (column, value) in data {
            columns.push(column.into());
            params.push(value.into());
        }
        if columns.is_empty() {
            return Err(DbError::EmptyValues("insert"));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            vec!["?"; params.len()].join(", ")
        );
        debug!(sql = %sql, "executing insert");

        let conn = self.db.lock()?;
        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        conn.execute(&sql, params_ref.as_slice())?;
        Ok(conn.last_insert_rowid())
    }

    /// Updates matching rows and returns the affected count.
    ///
    /// SET values occupy the earliest placeholders; the WHERE
    /// bindings follow them.
    pub fn update<I, K, V>(self, data: I) -> DbResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.check_misuse()?;
        let table = match &self.source {
            Some(source) => source.table_name()?.to_string(),
            None => return Err(DbError::TableNotSet),
        };

        let mut sets = vec![];
        let mut params = vec![];
        for (column, value) in data {
            sets.push(format!("{} = ?", column.into()));
            params.push(value.into());
        }
        if sets.is_empty() {
            return Err(DbError::EmptyValues("update"));
        }
        params.extend(self.where_bindings.iter().cloned());

        let sql = format!(
            "UPDATE {} SET {}{}",
            table,
            sets.join(", "),
            self.compile_where()
        );
        debug!(sql = %sql, "executing update");

        let conn = self.db.lock()?;
        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        Ok(conn.execute(&sql, params_ref.as_slice())?)
    }

    /// Deletes matching rows and returns the affected count.
    pub fn delete(self) -> DbResult<usize> {
        self.check_misuse()?;
        let table = match &self.source {
            Some(source) => source.table_name()?.to_string(),
            None => return Err(DbError::TableNotSet),
        };

        let params = self.where_bindings.clone();
        let sql = format!("DELETE FROM {}{}", table, self.compile_where());
        debug!(sql = %sql, "executing delete");

        let conn = self.db.lock()?;
        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        Ok(conn.execute(&sql, params_ref.as_slice())?)
    }
}

enum Transform<T> {
    Row(Box<dyn FnMut(Row) -> T>),
    Spread(Box<dyn FnMut(&[Value]) -> T>),
}

impl<T> Transform<T> {
    fn apply(&mut self, row: Row) -> T {
        match self {
            Transform::Row(f) => f(row),
            Transform::Spread(f) => f(row.values()),
        }
    }
}

/// Lazy, forward-only iterator of transformed rows.
///
/// Rows are pulled from the driver in batches by wrapping the
/// compiled SELECT in `SELECT * FROM (..) LIMIT ? OFFSET ?`; the
/// connection lock is held only while a batch is fetched.
pub struct MorphIter<T> {
    db: Arc<Mutex<Connection>>,
    sql: String,
    params: Vec<Value>,
    transform: Transform<T>,
    buffer: Vec<Row>,
    buffer_index: usize,
    fetched: u64,
    done: bool,
    pending_err: Option<DbError>,
}

impl<T> MorphIter<T> {
    fn fetch_next_batch(&mut self) -> DbResult<bool> {
        let sql = format!("SELECT * FROM ({}) LIMIT ? OFFSET ?", self.sql);
        trace!(sql = %sql, offset = self.fetched, "fetching morph batch");

        let mut params = self.params.clone();
        params.push(Value::Integer(MORPH_BATCH_SIZE as i64));
        params.push(Value::Integer(self.fetched as i64));

        let conn = self.db.lock()?;
        self.buffer = query_rows(&conn, &sql, &params)?;
        self.buffer_index = 0;
        self.fetched += self.buffer.len() as u64;

        if (self.buffer.len() as u64) < MORPH_BATCH_SIZE {
            self.done = true;
        }
        Ok(!self.buffer.is_empty())
    }
}

impl<T> Iterator for MorphIter<T> {
    type Item = DbResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_err.take() {
            self.done = true;
            self.buffer.clear();
            return Some(Err(err));
        }

        if self.buffer_index >= self.buffer.len() {
            if self.done {
                return None;
            }
            match self.fetch_next_batch() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }

        let row = self.buffer[self.buffer_index].clone();
        self.buffer_index += 1;
        Some(Ok(self.transform.apply(row)))
    }
}
