//! Pluggable exception handlers

use parking_lot::Mutex;

use super::TableError;

/// Receives errors that have no caller to be returned to.
///
/// Persistence stores and event handlers run while a mutation is being
/// applied. Their failures are passed here and the mutation completes.
pub trait ExceptionHandler: Send + Sync {
    /// Handles one error.
    fn handle(&self, error: &TableError);
}

/// Drops every error. This is the default handler of a new table.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoringExceptionHandler;

impl ExceptionHandler for IgnoringExceptionHandler {
    fn handle(&self, _error: &TableError) {}
}

/// Logs every error at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExceptionHandler;

impl ExceptionHandler for LoggingExceptionHandler {
    fn handle(&self, error: &TableError) {
        log::warn!("[table] {}", error);
    }
}

/// Keeps the message of every error it receives.
#[derive(Debug, Default)]
pub struct CollectingExceptionHandler {
    messages: Mutex<Vec<String>>,
}

impl CollectingExceptionHandler {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected messages in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Returns true if no error has been received.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl ExceptionHandler for CollectingExceptionHandler {
    fn handle(&self, error: &TableError) {
        self.messages.lock().push(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_handler_keeps_messages() {
        let handler = CollectingExceptionHandler::new();
        assert!(handler.is_empty());

        handler.handle(&TableError::handler("audit", "disk full"));
        assert_eq!(
            handler.messages(),
            vec!["Event handler 'audit' failed: disk full".to_string()]
        );
    }
}
