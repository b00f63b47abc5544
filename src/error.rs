//! Error types for sheetstock

use thiserror::Error;

/// Main error type for sheetstock
#[derive(Error, Debug)]
pub enum SheetStockError {
    /// Invalid user input, rejected before any state change
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Request could not complete or returned a non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape
    #[error("Response not in expected format: {0}")]
    Format(String),

    /// Operation requested on a file or record outside its supported set
    #[error("Not available for this file: {0}")]
    NotEligible(String),

    /// Backend answered but reported a failure
    #[error("Backend rejected the request: {0}")]
    Backend(String),

    #[error("No row is being edited")]
    NoActiveEdit,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl SheetStockError {
    /// True for failures that happened while talking to a remote service
    pub fn is_network(&self) -> bool {
        matches!(self, SheetStockError::Network(_) | SheetStockError::Format(_))
    }

    /// Short message suitable for a dismissible status line
    pub fn user_message(&self) -> String {
        match self {
            SheetStockError::Network(msg) => {
                format!("Cannot reach the backend service: {}", msg)
            }
            SheetStockError::Format(_) => "API response not in expected format".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for sheetstock operations
pub type Result<T> = std::result::Result<T, SheetStockError>;
