// errors.rs
use thiserror::Error;

/// Failures of the SQLite store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Open DB {path} failed: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection unavailable")]
    Unavailable,
}

/// Errors surfaced by the market view, mapped to HTTP statuses in `responses`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Database Error: {0}")]
    DbError(#[from] StoreError),
    #[error("Spreadsheet Error: {0}")]
    XlsxError(String),
    #[error("Internal Server Error")]
    InternalError,
}
