//! Error types for bm-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bm-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bm-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Store unreachable, missing or empty when a session is opened
    #[error("Initialization failed: {0}")]
    Init(String),

    /// The requested prefix yielded no entries on its first page
    #[error("The folder is empty or does not exist: {0}")]
    EmptyResult(String),

    /// Listing or retrieval transport failure
    #[error("Remote error: {0}")]
    Remote(String),

    /// Object or bucket not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local directory creation failure
    #[error("Error creating folder {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying an object's bytes to disk failed
    #[error("Failed to download file {key}: {source}")]
    Download {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Key that cannot be used as requested
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A file entry was passed where a folder is required
    #[error("The provided resource is not a folder: {0}")]
    NotAFolder(String),

    /// The session's worker pool has been shut down
    #[error("Session is closed")]
    SessionClosed,

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidKey(_) | Error::NotAFolder(_) => 2, // UsageError
            Error::Config(_) | Error::InvalidUrl(_) => 2,     // UsageError
            Error::Remote(_) => 3,                            // RemoteError
            Error::Init(_) => 4,                              // InitError
            Error::NotFound(_) | Error::EmptyResult(_) => 5,  // NotFound
            _ => 1,                                           // GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidKey("..".into()).exit_code(), 2);
        assert_eq!(Error::NotAFolder("a.txt".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Remote("test".into()).exit_code(), 3);
        assert_eq!(Error::Init("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::EmptyResult("photos/".into()).exit_code(), 5);
        assert_eq!(Error::SessionClosed.exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::EmptyResult("photos/".into());
        assert_eq!(
            err.to_string(),
            "The folder is empty or does not exist: photos/"
        );

        let err = Error::Filesystem {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("Error creating folder /tmp/x"));

        let err = Error::Download {
            key: "a/b.txt".into(),
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        };
        assert!(err.to_string().contains("a/b.txt"));
    }
}
