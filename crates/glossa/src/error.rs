//! Error types for Glossa

use thiserror::Error;

/// Main error type for Glossa operations
#[derive(Error, Debug)]
pub enum GlossaError {
    /// No dialect claims the requested model name
    #[error("No dialect can translate model '{0}'")]
    NoDialectFor(String),

    /// Prompt cannot fit the model context even after maximal trimming
    #[error("Prompt exceeds model capacity: needs {needed} tokens, budget is {budget}")]
    PromptTooLong { needed: usize, budget: usize },

    /// Prompt construction errors (invariant violations)
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Completion driver errors (transport failures surfaced by the caller)
    #[error("Completion error: {0}")]
    Completion(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Glossa operations
pub type Result<T> = std::result::Result<T, GlossaError>;
