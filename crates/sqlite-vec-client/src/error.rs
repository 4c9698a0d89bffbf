use thiserror::Error;

/// Errors returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum VecClientError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid table name: {0}")]
    TableName(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("connection pool exhausted (max={max})")]
    PoolExhausted { max: usize },
    #[error("import error: {0}")]
    Import(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VecClientError {
    /// True for the input-validation family (bad identifiers, pagination,
    /// shapes). Dimension mismatches are reported separately.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::TableName(_))
    }
}

pub type Result<T, E = VecClientError> = std::result::Result<T, E>;
