use crate::contracts::batch::BatchReport;
use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiflowError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Database is not initialized")]
    NotInitialized,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Business rule violation: {0}")]
    BusinessRuleError(String),
    #[error("Duplicate contract id: {0}")]
    DuplicateId(String),
    #[error("{0}")]
    BatchError(BatchReport),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ArchiflowError {
    /// Failures of the storage layer itself, as opposed to rejected input.
    pub fn is_database_error(&self) -> bool {
        matches!(
            self,
            ArchiflowError::RusqliteError(_)
                | ArchiflowError::IoError(_)
                | ArchiflowError::NotInitialized
                | ArchiflowError::DatabaseError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArchiflowError>;
