//! Error types for fan-out, fan-in and tee pipelines.

use std::sync::Arc;

/// The main error type for pipeline primitives and stages.
///
/// `Error` is `Clone` so a per-item failure can travel through a tee and
/// reach every sink.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A stage failed to transform one item
    #[error("Stage error: {0}")]
    Stage(Arc<dyn std::error::Error + Send + Sync>),

    /// The cancellation scope fired while the operation was blocked
    #[error("Pipeline was cancelled")]
    Cancelled,

    /// Every reader of a stream went away before the write completed
    #[error("Channel was closed unexpectedly")]
    ChannelClosed,

    /// A worker group was configured with no workers
    #[error("Invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),

    /// An operation timed out
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),
}

// Convenience constructors
impl Error {
    /// Create a per-item stage error from any error type
    pub fn stage<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Stage(Arc::new(error))
    }

    /// Create a timeout error
    pub fn timeout(duration_ms: u64) -> Self {
        Error::Timeout { duration_ms }
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }

    /// Whether this error came from the cancellation scope rather than the data.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

// Common conversions
impl<T> From<async_channel::SendError<T>> for Error {
    fn from(_: async_channel::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Error::Custom(format!("Timeout: {}", e))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for turning a foreign failure into a per-item stage error
pub trait IntoStageError<T> {
    fn into_stage_error(self) -> Result<T>;
}

impl<T, E> IntoStageError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_stage_error(self) -> Result<T> {
        self.map_err(Error::stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_keeps_source_message() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = Error::stage(io);
        assert_eq!(err.to_string(), "Stage error: connection reset");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn into_stage_error_wraps_foreign_errors() {
        let parsed: std::result::Result<u32, _> = "x".parse::<u32>();
        let err = parsed.into_stage_error().unwrap_err();
        assert!(matches!(err, Error::Stage(_)));
    }

    #[test]
    fn invalid_worker_count_display() {
        assert_eq!(
            Error::InvalidWorkerCount(0).to_string(),
            "Invalid worker count 0: at least one worker is required"
        );
    }
}
