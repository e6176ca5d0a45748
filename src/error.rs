//! Error types for the launch and elevation subsystems.
//!
//! Every failure the orchestrator can surface is one of four kinds
//! (see [`ErrorKind`]); configuration store failures get their own variants
//! so the front end can report them separately.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the launcher library.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// `account_path` is empty or does not exist on disk
    #[error("Shortcut target not found: {path:?}")]
    InvalidShortcut { path: PathBuf },

    /// `game_type` is not one of the known client modes
    #[error("Unsupported game type: {value:?}")]
    UnsupportedGameType { value: String },

    /// The OS scheduler refused to create, query or remove the elevation task
    #[error("Elevation task setup failed: {message}")]
    ElevationSetup {
        message: String,
        /// Exit code or OS error code, when the OS reported one
        code: Option<i32>,
    },

    /// The OS refused or failed to create the target process
    #[error("Failed to start {executable:?}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification used for user-facing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidShortcut,
    UnsupportedGameType,
    ElevationSetup,
    Spawn,
    Config,
}

impl LaunchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LaunchError::InvalidShortcut { .. } => ErrorKind::InvalidShortcut,
            LaunchError::UnsupportedGameType { .. } => ErrorKind::UnsupportedGameType,
            LaunchError::ElevationSetup { .. } => ErrorKind::ElevationSetup,
            LaunchError::Spawn { .. } => ErrorKind::Spawn,
            LaunchError::Config { .. } | LaunchError::Io { .. } => ErrorKind::Config,
        }
    }

    /// OS-level error code carried by the error, if any.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            LaunchError::ElevationSetup { code, .. } => *code,
            LaunchError::Spawn { source, .. } => source.raw_os_error(),
            LaunchError::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    pub(crate) fn elevation(message: impl Into<String>, code: Option<i32>) -> Self {
        LaunchError::ElevationSetup {
            message: message.into(),
            code,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        LaunchError::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = LaunchError::InvalidShortcut {
            path: PathBuf::from("missing.exe"),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidShortcut);

        let err = LaunchError::config("bad json");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_os_code() {
        let err = LaunchError::elevation("access denied", Some(5));
        assert_eq!(err.os_code(), Some(5));

        let err = LaunchError::Spawn {
            executable: PathBuf::from("game.exe"),
            source: std::io::Error::from_raw_os_error(2),
        };
        assert_eq!(err.os_code(), Some(2));
        assert!(err.to_string().contains("game.exe"));
    }
}
