//! Core error types for diagram standardization
//!
//! Every stage of the pipeline reports failures through [`C4Error`]. The engine
//! never logs-and-continues on structurally invalid input.

use thiserror::Error;

/// Convenience alias used throughout the library
pub type Result<T> = std::result::Result<T, C4Error>;

/// Core error types for diagram standardization
#[derive(Error, Debug)]
pub enum C4Error {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Malformed graph: {message}")]
    MalformedGraph { message: String },

    #[error("Empty diagram: nothing to standardize")]
    EmptyDiagram,

    #[error("Ambiguous main system: {} candidates ({})", .candidates.len(), .candidates.join(", "))]
    AmbiguousMainSystem { candidates: Vec<String> },

    #[error("Selection error: {message}")]
    Selection { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Vision extraction error: {message}")]
    Vision { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl C4Error {
    /// Create a new parse error
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new malformed graph error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedGraph {
            message: message.into(),
        }
    }

    /// Create a new selection error
    pub fn selection_error(message: impl Into<String>) -> Self {
        Self::Selection {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new vision extraction error
    pub fn vision_error(message: impl Into<String>) -> Self {
        Self::Vision {
            message: message.into(),
        }
    }
}

impl From<roxmltree::Error> for C4Error {
    fn from(err: roxmltree::Error) -> Self {
        Self::parse_error(format!("XML is not well-formed: {}", err))
    }
}

impl From<serde_json::Error> for C4Error {
    fn from(err: serde_json::Error) -> Self {
        Self::parse_error(format!("invalid graph JSON: {}", err))
    }
}
