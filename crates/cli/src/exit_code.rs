//! Exit code definitions for bmirror
//!
//! Scripts rely on these values; changing one is a breaking change.

/// Exit codes for the bmirror CLI application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,

    /// General/unspecified error
    GeneralError = 1,

    /// User input error: invalid arguments, malformed key, bad configuration
    UsageError = 2,

    /// The object store failed or could not be reached
    RemoteError = 3,

    /// The bucket could not be validated when opening a session
    InitError = 4,

    /// Resource not found: profile, key or prefix does not exist
    NotFound = 5,

    /// A tree download finished but some files failed
    PartialFailure = 6,

    /// Operation was interrupted (e.g., Ctrl+C)
    Interrupted = 130,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::RemoteError),
            4 => Some(Self::InitError),
            5 => Some(Self::NotFound),
            6 => Some(Self::PartialFailure),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Exit code for a core error
    pub fn from_error(error: &bm_core::Error) -> Self {
        Self::from_i32(error.exit_code()).unwrap_or(Self::GeneralError)
    }

    /// Get a human-readable description of the exit code
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Operation completed successfully",
            Self::GeneralError => "General error",
            Self::UsageError => "Invalid arguments or configuration",
            Self::RemoteError => "Object store error",
            Self::InitError => "Bucket validation failed",
            Self::NotFound => "Resource not found",
            Self::PartialFailure => "Some files failed to download",
            Self::Interrupted => "Operation interrupted",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_core::Error;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::RemoteError.as_i32(), 3);
        assert_eq!(ExitCode::InitError.as_i32(), 4);
        assert_eq!(ExitCode::NotFound.as_i32(), 5);
        assert_eq!(ExitCode::PartialFailure.as_i32(), 6);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_exit_code_from_i32() {
        for code in [0, 1, 2, 3, 4, 5, 6, 130] {
            assert_eq!(ExitCode::from_i32(code).map(ExitCode::as_i32), Some(code));
        }
        assert_eq!(ExitCode::from_i32(7), None);
        assert_eq!(ExitCode::from_i32(99), None);
    }

    #[test]
    fn test_exit_code_from_error() {
        assert_eq!(
            ExitCode::from_error(&Error::Init("bucket is empty".into())),
            ExitCode::InitError
        );
        assert_eq!(
            ExitCode::from_error(&Error::NotFound("a.txt".into())),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from_error(&Error::EmptyResult("photos/".into())),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from_error(&Error::Remote("timeout".into())),
            ExitCode::RemoteError
        );
        assert_eq!(
            ExitCode::from_error(&Error::NotAFolder("a.txt".into())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from_error(&Error::SessionClosed),
            ExitCode::GeneralError
        );
    }

    #[test]
    fn test_exit_code_display() {
        let display = format!("{}", ExitCode::PartialFailure);
        assert!(display.contains("6"));
        assert!(display.contains("failed"));

        let display = format!("{}", ExitCode::NotFound);
        assert!(display.contains("5"));
        assert!(display.contains("not found"));
    }
}
