//! DMMGamePlayer Fast Launcher Library
//!
//! Core functionality behind the launcher front end:
//! - Shortcut records persisted in config.json (shortcut, config modules)
//! - Elevation through a scheduled task instead of a UAC prompt (elevation module)
//! - Building and spawning client command lines (launch module)

pub mod config;
pub mod elevation;
pub mod error;
pub mod launch;
pub mod picker;
pub mod shortcut;

pub use error::{ErrorKind, LaunchError};
