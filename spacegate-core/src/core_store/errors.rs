/*
    errors.rs - Error types for the store subsystem

    Covers connection pool exhaustion, SQLite failures and rows that no
    longer decode into domain types.
*/

use thiserror::Error;

/// Errors that can occur in the store subsystem
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not check out a connection
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// SQLite rejected a statement
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A persisted row does not decode
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Database directory could not be prepared
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
