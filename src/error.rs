//! Error types for the conducir crate.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// `CheckpointNotFound` is the only recoverable variant: the trainer falls
/// back to a fresh start when resume finds nothing usable. Everything else
/// terminates the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no checkpoint at {path}")]
    CheckpointNotFound { path: PathBuf },

    #[error("checkpoint I/O failed at {path}: {source}")]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("no data source carries its configured dataset key")]
    NoValidSources,
}

impl Error {
    /// True for errors the trainer is allowed to recover from.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::CheckpointNotFound { .. })
    }
}

/// Result type for conducir operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_not_found_is_recoverable() {
        let err = Error::CheckpointNotFound { path: PathBuf::from("/tmp/x.json") };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_io_and_config_errors_are_fatal() {
        let io = Error::CheckpointIo {
            path: PathBuf::from("/tmp/x.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!io.is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
        assert!(!Error::NoValidSources.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_path() {
        let err = Error::CheckpointNotFound { path: PathBuf::from("/run/key.json") };
        assert!(err.to_string().contains("/run/key.json"));
    }
}
