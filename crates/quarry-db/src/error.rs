//! Error types for quarry-db.

use thiserror::Error;

/// Errors produced while building or executing a statement.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("no table set for statement")]
    TableNotSet,

    #[error("statement source already set, rejected `{0}`")]
    SourceAlreadySet(String),

    #[error("no values supplied for {0}")]
    EmptyValues(&'static str),

    #[error("SQLite database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DbError::Poisoned
    }
}

/// Result type alias for quarry-db operations.
pub type DbResult<T> = std::result::Result<T, DbError>;
