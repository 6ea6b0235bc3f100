use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvergeError {
    #[error("Convergence timeout in '{tag}' after {attempts} attempts: {detail}")]
    ConvergenceTimeout {
        tag: String,
        attempts: u32,
        detail: String,
    },

    #[error("Admin RPC failed: {0}")]
    Rpc(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Table '{0}' is not enabled")]
    TableNotEnabled(String),

    #[error("Table '{0}' is not disabled")]
    TableNotDisabled(String),

    #[error("Invalid table '{0}': {1}")]
    InvalidTable(String, String),

    #[error("Region '{0}' not found")]
    RegionNotFound(String),

    #[error("Server '{0}' not found")]
    ServerNotFound(String),

    #[error("Invalid split point for table '{0}': {1}")]
    InvalidSplitPoint(String, String),

    #[error("Invalid retry budget: {0}")]
    InvalidBudget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, ConvergeError>;

impl<T> From<std::sync::PoisonError<T>> for ConvergeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for ConvergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
