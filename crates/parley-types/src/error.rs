use thiserror::Error;

/// Errors returned by the remote conversation store (the sync API).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("entity not found")]
    NotFound,

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Errors returned by the budget gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BudgetError {
    #[error("budget service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid balance response: {0}")]
    Decode(String),
}

/// Errors from local repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    /// A stored value no longer decodes into its domain type.
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}
