//! Common error types for diagpack.

use thiserror::Error;

/// Common error type for diagpack operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Artifact collection failed: {0}")]
    Collection(String),

    #[error("Metadata lookup failed: {0}")]
    Metadata(String),

    #[error("Archive write failed: {context} - {reason}")]
    ArchiveWrite { context: String, reason: String },

    #[error("Media index notification failed: {0}")]
    IndexNotify(String),

    #[error("Storage permission denied")]
    PermissionDenied,

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Unsupported native architecture: {0}")]
    UnsupportedArch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build an archive write error from any displayable cause.
    pub fn archive(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::ArchiveWrite {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Attach archive context to fallible archive operations.
pub trait ArchiveContext<T> {
    fn archive_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: std::fmt::Display> ArchiveContext<T> for std::result::Result<T, E> {
    fn archive_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::archive(context, e))
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_context_wraps_cause() {
        let failed: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let err = failed.archive_context("adding info.json").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Archive write failed: adding info.json - disk full"
        );
    }

    #[test]
    fn test_anyhow_errors_become_other() {
        let err: Error = anyhow::anyhow!("bad config").into();
        assert!(matches!(err, Error::Other(ref msg) if msg == "bad config"));
    }
}
