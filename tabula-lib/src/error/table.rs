//! TableError, the umbrella error routed to exception handlers

use super::PersistenceError;

/// Errors raised by collaborators reacting to table mutations.
///
/// A mutation never fails because an observer failed. Instead the error is
/// handed to the table's [`ExceptionHandler`](super::ExceptionHandler).
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// A persistence store failed to apply a change.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A user event handler reported a failure.
    #[error("Event handler '{handler}' failed: {message}")]
    Handler {
        /// Name of the handler.
        handler: String,
        /// Failure description.
        message: String,
    },
}

impl TableError {
    /// Creates a new handler error.
    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }
}
