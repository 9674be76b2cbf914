//! The statement builder.
//!
//! A [`Statement`] holds one query under construction. Fluent
//! configuration methods accumulate state; a terminal operation
//! (`get`, `first`, `insert`, `update`, `delete`, `morph`) compiles
//! the SQL, lines the bound values up with the placeholders, and runs
//! it against the shared connection.
//!
//! Nested statements (subqueries, unions, condition groups) are fresh
//! owned values sharing only the connection handle; their compiled
//! text and bindings are spliced into the parent exactly once, at the
//! call position.

mod builder;
mod compile;
mod condition;
mod exec;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::error::{DbError, DbResult};
use crate::value::Value;

pub use exec::MorphIter;

/// The configured source of a statement.
#[derive(Debug, Clone)]
pub(crate) enum Source {
    /// Raw table reference, possibly `"name alias"` or `"name AS alias"`.
    Table(String),
    /// Compiled subquery text embedded as `(sql) AS alias`.
    Subquery { sql: String, alias: String },
}

/// Boolean connector linking a condition to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Connector {
    And,
    Or,
}

impl Connector {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// One rendered condition fragment with its connector.
#[derive(Debug, Clone)]
pub(crate) struct Cond {
    pub(crate) connector: Connector,
    pub(crate) sql: String,
}

/// A builder misuse recorded mid-chain and surfaced at compile time.
///
/// Fluent methods return `Self`, so precondition violations cannot be
/// reported where they happen; the first one is remembered and raised
/// by the next compile or terminal operation.
#[derive(Debug, Clone)]
pub(crate) enum Misuse {
    SourceAlreadySet(String),
    TableNotSet,
}

/// One query under construction.
#[derive(Debug)]
pub struct Statement {
    pub(crate) db: Arc<Mutex<Connection>>,
    pub(crate) columns: Vec<String>,
    pub(crate) source: Option<Source>,
    pub(crate) joins: Vec<String>,
    pub(crate) wheres: Vec<Cond>,
    pub(crate) havings: Vec<Cond>,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unions: Vec<String>,
    pub(crate) where_bindings: Vec<Value>,
    pub(crate) having_bindings: Vec<Value>,
    pub(crate) union_bindings: Vec<Value>,
    pub(crate) misuse: Option<Misuse>,
}

impl Statement {
    pub(crate) fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self {
            db,
            columns: vec![],
            source: None,
            joins: vec![],
            wheres: vec![],
            havings: vec![],
            group_by: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
            unions: vec![],
            where_bindings: vec![],
            having_bindings: vec![],
            union_bindings: vec![],
            misuse: None,
        }
    }

    /// Fresh nested statement sharing this statement's connection.
    pub(crate) fn nested(&self) -> Self {
        Statement::new(self.db.clone())
    }

    pub(crate) fn check_misuse(&self) -> DbResult<()> {
        match &self.misuse {
            Some(Misuse::SourceAlreadySet(table)) => {
                Err(DbError::SourceAlreadySet(table.clone()))
            }
            Some(Misuse::TableNotSet) => Err(DbError::TableNotSet),
            None => Ok(()),
        }
    }

    /// Remembers the first compile error raised by a nested statement.
    pub(crate) fn record_compile_error(&mut self, err: DbError) {
        if self.misuse.is_none() {
            self.misuse = Some(match err {
                DbError::SourceAlreadySet(table) => Misuse::SourceAlreadySet(table),
                _ => Misuse::TableNotSet,
            });
        }
    }
}
