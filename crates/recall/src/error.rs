//! Error types for Recall

use thiserror::Error;

use crate::classifier::ClassifierError;

/// Main error type for Recall operations
#[derive(Error, Debug)]
pub enum RecallError {
    /// Storage-related errors (LanceDB, file system, etc.)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Embedding generation errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier errors, including contract violations on unparseable output
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// Decision referenced a target that is missing or outside the candidate set
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Recall operations
pub type Result<T> = std::result::Result<T, RecallError>;
