//! Pending launch handed to the elevated instance
//!
//! The elevation task always runs the same command line, so the command an
//! unelevated launch wants to start is parked in the data directory. The
//! instance the task starts takes it, spawns it with the inherited elevated
//! token and the file is gone afterwards.

use super::LaunchCommand;
use crate::config::get_data_directory;
use crate::error::{LaunchError, Result};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const HANDOFF_FILE: &str = "pending_launch.json";

#[derive(Debug, Clone)]
pub struct Handoff {
    path: PathBuf,
}

impl Handoff {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Handoff file inside the application's data directory
    pub fn in_data_dir() -> Result<Self> {
        Ok(Self::new(get_data_directory()?.join(HANDOFF_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Park a command for the elevated instance, replacing any earlier one
    pub fn store(&self, command: &LaunchCommand) -> Result<()> {
        let json = serde_json::to_string_pretty(command)
            .map_err(|e| LaunchError::config(format!("Failed to serialize launch: {}", e)))?;

        fs::write(&self.path, json).map_err(|source| LaunchError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!("Launch handed off via {:?}", self.path);
        Ok(())
    }

    /// Remove and return the pending command. `None` when nothing is pending.
    /// The file is removed even if its contents cannot be parsed.
    pub fn take(&self) -> Result<Option<LaunchCommand>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LaunchError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        self.clear()?;

        serde_json::from_str(&contents).map(Some).map_err(|e| {
            LaunchError::config(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Drop the pending command, if any
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(source) => Err(LaunchError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
