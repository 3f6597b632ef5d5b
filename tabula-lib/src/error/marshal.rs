//! Serialization error types

/// Errors that can occur while marshalling or unmarshalling a table.
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading from or writing to the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not well formed for the given format.
    #[error("{format} syntax error at line {line}: {message}")]
    Syntax {
        /// Format name (e.g., "xml", "csv").
        format: &'static str,
        /// One-based line number of the offending input.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The input is well formed but does not describe a table.
    #[error("{format} structure error: {message}")]
    Structure {
        /// Format name.
        format: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// An element string could not be parsed into the element type.
    #[error("Cannot parse element '{value}': {message}")]
    Element {
        /// The raw text that failed to parse.
        value: String,
        /// Parser error message.
        message: String,
    },
}

impl MarshalError {
    /// Creates a new syntax error.
    pub fn syntax(format: &'static str, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            format,
            line,
            message: message.into(),
        }
    }

    /// Creates a new structure error.
    pub fn structure(format: &'static str, message: impl Into<String>) -> Self {
        Self::Structure {
            format,
            message: message.into(),
        }
    }

    /// Creates a new element parse error.
    pub fn element(value: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Element {
            value: value.into(),
            message: message.to_string(),
        }
    }
}
