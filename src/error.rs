//! Error types for course-dl
//!
//! The pipeline distinguishes three classes of failure:
//! - [`FetchError`] - a job could not be turned into an item (fatal to the run)
//! - [`SaveError`] - one item could not be persisted (logged, not fatal)
//! - [`Error::Cancelled`] - a consequence of some other fatal error, never a cause

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for course-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for course-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pipeline.workers")
        key: Option<String>,
    },

    /// The catalog could not produce a job list
    #[error("catalog error: {0}")]
    Catalog(String),

    /// A requested catalog entry does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A job's fetch failed; fatal to the whole run
    #[error("failed to fetch {job}: {source}")]
    Fetch {
        /// Description of the job that failed (names its reference ID)
        job: String,
        /// The underlying fetch failure
        #[source]
        source: FetchError,
    },

    /// The pipeline was cancelled before the work was done
    #[error("pipeline cancelled")]
    Cancelled,

    /// The worker pool was not started, or its intake is already closed
    #[error("worker pool is not accepting jobs")]
    PoolClosed,

    /// More jobs were submitted than the pool's result capacity allows
    #[error("worker pool capacity of {capacity} jobs exceeded")]
    CapacityExceeded {
        /// Number of jobs the pool was sized for
        capacity: usize,
    },

    /// A worker task panicked or was aborted
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked {
        /// Index of the worker inside its pool
        worker: usize,
        /// Panic payload rendered as text
        message: String,
    },

    /// The pool already reported this failure from an earlier `wait`
    #[error("worker pool already failed: {message}")]
    PoolFailed {
        /// Message of the error the first `wait` returned
        message: String,
    },

    /// Sink failure that prevents any item from being stored
    #[error("save error: {0}")]
    Save(#[from] SaveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside of a job fetch (e.g. building the HTTP client)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Returns true if this error is only a consequence of cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Coarse classification of a [`FetchError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The remote source could not be reached or read
    Transport,
    /// The remote source answered with data of the wrong shape
    Decode,
}

/// Failure to turn a job into an item
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or its body could not be read
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The body was not valid for the expected schema
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Requested URL
        url: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// The body decoded but lacks a field the item cannot exist without
    #[error("response from {url} is missing {field}")]
    MissingField {
        /// Requested URL
        url: String,
        /// Name of the missing field
        field: &'static str,
    },
}

impl FetchError {
    /// Classify the error as a transport or a decode failure
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport { .. } | FetchError::Status { .. } => FetchErrorKind::Transport,
            FetchError::Decode { .. } | FetchError::MissingField { .. } => FetchErrorKind::Decode,
        }
    }

    /// URL of the request that failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. }
            | FetchError::MissingField { url, .. } => url,
        }
    }
}

/// Failure to persist one item
#[derive(Debug, Error)]
pub enum SaveError {
    /// Filesystem failure
    #[error("failed to write {path}: {source}")]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The item could not be encoded
    #[error("failed to encode {path}: {source}")]
    Serialization {
        /// Target path
        path: PathBuf,
        /// Underlying encode error
        #[source]
        source: serde_json::Error,
    },
}

impl SaveError {
    /// Path the sink was writing when it failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            SaveError::Io { path, .. } | SaveError::Serialization { path, .. } => path,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_kinds() {
        let status = FetchError::Status {
            url: "http://x/api/document/1".into(),
            status: 503,
        };
        assert_eq!(status.kind(), FetchErrorKind::Transport);
        assert_eq!(status.url(), "http://x/api/document/1");

        let missing = FetchError::MissingField {
            url: "http://x/api/document/2".into(),
            field: "data.doc._id",
        };
        assert_eq!(missing.kind(), FetchErrorKind::Decode);

        let decode = FetchError::Decode {
            url: "http://x".into(),
            source: serde_json::from_str::<u32>("nope").unwrap_err(),
        };
        assert_eq!(decode.kind(), FetchErrorKind::Decode);
    }

    #[test]
    fn fetch_failure_names_the_job() {
        let err = Error::Fetch {
            job: "doc-3 (parent c-1)".into(),
            source: FetchError::Status {
                url: "http://x/api/document/doc-3".into(),
                status: 500,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("doc-3"), "got: {msg}");
        assert!(msg.contains("500"), "got: {msg}");
        assert!(!err.is_cancelled());
        assert!(Error::Cancelled.is_cancelled());
    }

    #[test]
    fn config_error_carries_key() {
        match Error::config("must be at least 1", "pipeline.workers") {
            Error::Config { message, key } => {
                assert_eq!(message, "must be at least 1");
                assert_eq!(key.as_deref(), Some("pipeline.workers"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
