//! Error types for the supervisor directory.
//!
//! Lookup misses (unknown record, unknown badge, badge already present) are
//! never errors; the store reports them as "nothing changed". Everything in
//! this module is either a startup failure (data, configuration) or a
//! recoverable export failure.

use std::path::PathBuf;
use thiserror::Error;

use crate::export::CaptureError;

/// The main error type for supervisor directory operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Data Errors ===
    /// Failed to read a data file.
    #[error("failed to read data file {path}: {source}")]
    DataRead {
        /// Path to the data file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A data file was not valid JSON for the expected schema.
    #[error("failed to parse data file {path}: {source}")]
    DataParse {
        /// Path to the data file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Loaded data violates a directory invariant.
    #[error("invalid directory data: {message}")]
    DataValidation {
        /// Description of the violation.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Export Errors ===
    /// The rasterizer could not capture the card.
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// An export is already running for this card.
    #[error("export already in progress for {email}")]
    ExportInProgress {
        /// Key of the card being exported.
        email: String,
    },

    /// The card to capture is not rendered.
    #[error("capture target unavailable for {email}")]
    MissingCaptureTarget {
        /// Key of the card that was requested.
        email: String,
    },

    /// The download surface refused the produced file.
    #[error("failed to offer download {file_name}: {message}")]
    Download {
        /// Name of the file being offered.
        file_name: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Session Errors ===
    /// A session command could not be parsed.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for supervisor directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a data validation error.
    #[must_use]
    pub fn data_validation(message: impl Into<String>) -> Self {
        Self::DataValidation {
            message: message.into(),
        }
    }

    /// Create a download error for the given file.
    #[must_use]
    pub fn download(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid command error.
    #[must_use]
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand(message.into())
    }

    /// Check if this error should be shown to the user as a capture failure.
    #[must_use]
    pub fn is_capture_failure(&self) -> bool {
        matches!(self, Self::Capture(_) | Self::Download { .. })
    }

    /// Check if this error means the card was not rendered.
    #[must_use]
    pub fn is_missing_target(&self) -> bool {
        matches!(self, Self::MissingCaptureTarget { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::data_validation("missing name");
        assert!(err.to_string().contains("missing name"));

        let err = Error::ExportInProgress {
            email: "amy@x.com".to_string(),
        };
        assert_eq!(err.to_string(), "export already in progress for amy@x.com");
    }

    #[test]
    fn test_capture_error_is_capture_failure() {
        let err: Error = CaptureError::TaintedImage {
            src: "https://cdn.example.org/a.png".to_string(),
        }
        .into();
        assert!(err.is_capture_failure());
        assert!(!err.is_missing_target());
    }

    #[test]
    fn test_download_error_is_capture_failure() {
        let err = Error::download("Amy-profile.png", "disk full");
        assert!(err.is_capture_failure());
        let msg = err.to_string();
        assert!(msg.contains("Amy-profile.png"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_missing_target() {
        let err = Error::MissingCaptureTarget {
            email: "bob@x.com".to_string(),
        };
        assert!(err.is_missing_target());
        assert!(!err.is_capture_failure());
        assert!(err.to_string().contains("bob@x.com"));
    }

    #[test]
    fn test_data_validation_display() {
        let err = Error::data_validation("duplicate email a@x.com");
        assert!(err.to_string().contains("duplicate email"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_data_read_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DataRead {
            path: PathBuf::from("/srv/supervisors.json"),
            source: io_err,
        };
        assert!(err.to_string().contains("/srv/supervisors.json"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "scale must be positive".to_string(),
        };
        assert!(err.to_string().contains("scale must be positive"));
    }
}
