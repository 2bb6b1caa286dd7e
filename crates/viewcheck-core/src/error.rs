//! Unified error types for viewcheck
//!
//! Only faults that stop a run live here. A body that fails to decode is not an
//! error (the exchange just lacks a summary), and a missing report container is
//! a valid page state. A failing verdict is a result, not a fault.

use thiserror::Error;

/// Unified error type for all probe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    // Browser errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    // Page reading errors
    #[error("Extraction error: {0}")]
    Extraction(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    /// Whether this error aborted the run before a verdict could be reached
    /// because the target itself was unreachable.
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigation(_))
    }
}

/// Result type alias using ProbeError
pub type Result<T> = std::result::Result<T, ProbeError>;
