//! Error handling for keyreplay-rs
//!
//! One error enum covers the whole engine. Each variant maps to a failure
//! class the UI reports differently: hook problems, bad settings, broken
//! recording files, synthesis failures during playback, and commands issued
//! in a state that forbids them.

use thiserror::Error;

/// Main error type for keyreplay-rs operations
#[derive(Error, Debug)]
pub enum KeyReplayError {
    /// The global keyboard hook could not be installed or used
    #[error("Keyboard hook unavailable: {0}")]
    HookInstall(String),

    /// Replay settings out of range, or an operation targeted an empty recording
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A stored recording is malformed
    #[error("{}", format_persistence(.record, .message))]
    PersistenceFormat {
        /// Index of the offending record, when the failure is record-specific
        record: Option<usize>,
        message: String,
    },

    /// Synthesizing a key event failed during playback
    #[error("Playback failed: {0}")]
    PlaybackSynthesis(String),

    /// The command is not allowed in the current session state
    #[error("Precondition not met: {0}")]
    PreconditionViolation(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<KeyReplayError>,
    },
}

fn format_persistence(record: &Option<usize>, message: &str) -> String {
    match record {
        Some(index) => format!("Malformed recording (record {}): {}", index, message),
        None => format!("Malformed recording: {}", message),
    }
}

impl KeyReplayError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        KeyReplayError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a persistence error for a specific record
    pub fn malformed_record(record: usize, message: impl Into<String>) -> Self {
        KeyReplayError::PersistenceFormat {
            record: Some(record),
            message: message.into(),
        }
    }

    /// Build a persistence error for the document as a whole
    pub fn malformed(message: impl Into<String>) -> Self {
        KeyReplayError::PersistenceFormat {
            record: None,
            message: message.into(),
        }
    }

    /// The error with any context layers peeled off
    pub fn root(&self) -> &KeyReplayError {
        match self {
            KeyReplayError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_precondition_violation(&self) -> bool {
        matches!(self.root(), KeyReplayError::PreconditionViolation(_))
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self.root(), KeyReplayError::InvalidConfiguration(_))
    }

    pub fn is_persistence_format(&self) -> bool {
        matches!(self.root(), KeyReplayError::PersistenceFormat { .. })
    }

    pub fn is_hook_install(&self) -> bool {
        matches!(self.root(), KeyReplayError::HookInstall(_))
    }

    pub fn is_playback_synthesis(&self) -> bool {
        matches!(self.root(), KeyReplayError::PlaybackSynthesis(_))
    }
}

/// Result type alias for keyreplay-rs operations
pub type Result<T> = std::result::Result<T, KeyReplayError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KeyReplayError::PreconditionViolation("already recording".to_string());
        assert_eq!(err.to_string(), "Precondition not met: already recording");
    }

    #[test]
    fn test_persistence_error_names_record() {
        let err = KeyReplayError::malformed_record(3, "missing field `scan_code`");
        assert_eq!(
            err.to_string(),
            "Malformed recording (record 3): missing field `scan_code`"
        );

        let err = KeyReplayError::malformed("expected an array");
        assert_eq!(err.to_string(), "Malformed recording: expected an array");
    }

    #[test]
    fn test_error_with_context_keeps_kind() {
        let err = KeyReplayError::malformed("bad").with_context("Failed to load recording");
        assert!(err.to_string().starts_with("Failed to load recording"));
        assert!(err.is_persistence_format());
        assert!(!err.is_precondition_violation());
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(KeyReplayError::HookInstall("denied".into()));
        let err = result.context("Starting capture").unwrap_err();
        assert!(err.is_hook_install());
        assert!(err.to_string().contains("denied"));
    }
}
