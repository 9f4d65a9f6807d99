//! Connector error types.
//!
//! [`ConnectorError`] is the single error surface the task SDK exposes to
//! the host runtime. Variants follow the lifecycle: configuration errors
//! before any resource exists, resource errors during counter setup, poll
//! and filter errors while running, and stop errors during teardown.

use thiserror::Error;

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors that can occur inside a connector task.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A required configuration key is missing.
    #[error("missing config: {0}")]
    MissingConfig(String),

    /// A configuration value is malformed.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Counter or other lifecycle-scoped resource setup failed.
    #[error("resource error: {0}")]
    ResourceError(String),

    /// The plugin's poll hook failed. Propagated to the host unchanged;
    /// retry policy is the host's call.
    #[error("poll error: {0}")]
    PollError(String),

    /// The declared schema cannot be evaluated by the filter.
    #[error("filter error: {0}")]
    FilterError(String),

    /// The plugin's stop hook failed. Raised only after counter cleanup
    /// has completed.
    #[error("stop error: {0}")]
    StopError(String),

    /// A commit hook failed.
    #[error("commit error: {0}")]
    CommitError(String),

    /// A lifecycle method was called in the wrong state.
    #[error("invalid state: expected {expected}, actual {actual}")]
    InvalidState {
        /// The state the operation requires.
        expected: String,
        /// The state the task was actually in.
        actual: String,
    },

    /// Record serialization failed during conversion to wire form.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Catch-all for wrapped plugin errors.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ConnectorError {
    /// Wraps an arbitrary plugin error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
