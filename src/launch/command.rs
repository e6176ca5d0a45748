//! Launch command construction
//!
//! Turns a shortcut record into the executable, argument vector and working
//! directory that get handed to the process spawner. Building has no side
//! effects beyond reading file metadata.

use crate::config::AppConfig;
use crate::error::{LaunchError, Result};
use crate::shortcut::{GameType, LauncherShortcutRecord, Shortcut, ShortcutRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const PRODUCT_FLAG: &str = "--product-id";
pub const AUTO_UPDATE_FLAG: &str = "--auto-update";
pub const RICH_PRESENCE_FLAG: &str = "--rich-presence";
pub const GAME_TYPE_FLAG: &str = "--type";

/// A fully resolved process invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Whether this launch was requested with elevation
    pub elevate: bool,
}

impl LaunchCommand {
    /// Argument vector quoted for a Windows command line
    pub fn command_line(&self) -> String {
        join_arguments(&self.arguments)
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_argument(&self.executable.to_string_lossy()))?;
        if !self.arguments.is_empty() {
            write!(f, " {}", self.command_line())?;
        }
        Ok(())
    }
}

/// Builds launch commands against one configuration context
pub struct LaunchCommandBuilder<'a> {
    config: &'a AppConfig,
}

impl<'a> LaunchCommandBuilder<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Check that the record can be launched at all
    pub fn validate(&self, shortcut: Shortcut<'_>) -> Result<()> {
        existing_target(shortcut.account_path())?;
        if let Shortcut::Game(record) = shortcut {
            record.game_type()?;
        }
        Ok(())
    }

    pub fn build(&self, shortcut: Shortcut<'_>, elevate: bool) -> Result<LaunchCommand> {
        match shortcut {
            Shortcut::Game(record) => self.build_game(record, elevate),
            Shortcut::Launcher(record) => self.build_launcher(record, elevate),
        }
    }

    fn build_game(&self, record: &ShortcutRecord, elevate: bool) -> Result<LaunchCommand> {
        let target = existing_target(record.account_path())?;
        let game_type = record.game_type()?;

        // A directory target is started through the client with that directory as cwd
        let (executable, working_dir) = if target.is_dir() {
            (self.config.client_executable(), Some(target.to_path_buf()))
        } else {
            (target.to_path_buf(), target.parent().map(Path::to_path_buf))
        };

        let mut arguments = vec![mode_argument(game_type)];
        if !record.product_id().is_empty() {
            arguments.push(format!("{}={}", PRODUCT_FLAG, record.product_id()));
        }
        if record.auto_update() {
            arguments.push(AUTO_UPDATE_FLAG.to_string());
        }
        if record.rich_presence() {
            arguments.push(RICH_PRESENCE_FLAG.to_string());
        }
        arguments.extend(record.launch_arguments().iter().cloned());

        Ok(LaunchCommand {
            executable,
            arguments,
            working_dir: working_dir.filter(|dir| !dir.as_os_str().is_empty()),
            elevate,
        })
    }

    fn build_launcher(&self, record: &LauncherShortcutRecord, elevate: bool) -> Result<LaunchCommand> {
        let target = existing_target(record.account_path())?;

        Ok(LaunchCommand {
            executable: target.to_path_buf(),
            arguments: record.dgp_args().to_vec(),
            working_dir: target
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf),
            elevate,
        })
    }
}

fn existing_target(path: &Path) -> Result<&Path> {
    if path.as_os_str().is_empty() || !path.exists() {
        return Err(LaunchError::InvalidShortcut {
            path: path.to_path_buf(),
        });
    }
    Ok(path)
}

fn mode_argument(game_type: GameType) -> String {
    format!("{}={}", GAME_TYPE_FLAG, game_type.tag())
}

/// Split a persisted argument string into tokens using the MSVC rules:
/// whitespace separates tokens and double quotes group. `2n` backslashes
/// before a quote become `n` backslashes and the quote toggles grouping,
/// `2n + 1` become `n` backslashes and a literal quote. Other backslashes
/// are kept as-is.
pub fn split_arguments(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let mut backslashes = 1;
                while chars.peek() == Some(&'\\') {
                    chars.next();
                    backslashes += 1;
                }
                in_token = true;

                if chars.peek() == Some(&'"') {
                    current.extend(std::iter::repeat('\\').take(backslashes / 2));
                    if backslashes % 2 == 1 {
                        chars.next();
                        current.push('"');
                    }
                } else {
                    current.extend(std::iter::repeat('\\').take(backslashes));
                }
            }
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Quote one token following the MSVC command-line parsing rules
fn quote_argument(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '\n', '"']) {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat('\\').take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    quoted
}

/// Join tokens into a single command-line string
pub fn join_arguments<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| quote_argument(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::{NamedTempFile, TempDir};

    fn record_for(path: &Path) -> ShortcutRecord {
        ShortcutRecord::new("", path)
    }

    #[test]
    fn test_missing_path_is_invalid() {
        let config = AppConfig::default();
        let builder = LaunchCommandBuilder::new(&config);

        let record = ShortcutRecord::new("123", "/no/such/place/game.exe");
        let err = builder.build(Shortcut::Game(&record), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidShortcut);

        let empty = ShortcutRecord::default();
        let err = builder.build(Shortcut::Game(&empty), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidShortcut);
    }

    #[test]
    fn test_unknown_game_type() {
        let exe = NamedTempFile::new().unwrap();
        let config = AppConfig::default();
        let builder = LaunchCommandBuilder::new(&config);

        for tag in ["", "gcl", "VR", "GCL "] {
            let mut record = record_for(exe.path());
            record.set_game_type_tag(tag);
            let err = builder.build(Shortcut::Game(&record), false).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedGameType, "tag {:?}", tag);
        }
    }

    #[test]
    fn test_argument_order() {
        let exe = NamedTempFile::new().unwrap();
        let config = AppConfig::default();
        let builder = LaunchCommandBuilder::new(&config);

        let mut record = ShortcutRecord::new("123", exe.path());
        record.set_launch_arguments(["--foo", "bar"]);
        record.set_auto_update(true);
        record.set_rich_presence(false);

        let command = builder.build(Shortcut::Game(&record), false).unwrap();
        assert_eq!(command.executable, exe.path());
        assert_eq!(
            command.arguments,
            ["--type=GCL", "--product-id=123", "--auto-update", "--foo", "bar"]
        );
        assert!(!command.arguments.iter().any(|a| a == RICH_PRESENCE_FLAG));
        assert!(!command.elevate);
    }

    #[test]
    fn test_optional_flags_omitted() {
        let exe = NamedTempFile::new().unwrap();
        let config = AppConfig::default();
        let builder = LaunchCommandBuilder::new(&config);

        let mut record = record_for(exe.path());
        record.set_auto_update(false);
        record.set_rich_presence(true);
        record.set_game_type(GameType::Acl);

        let command = builder.build(Shortcut::Game(&record), true).unwrap();
        assert_eq!(command.arguments, ["--type=ACL", "--rich-presence"]);
        assert!(command.elevate);
    }

    #[test]
    fn test_directory_target_uses_client() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.dmm_game_player_folder = PathBuf::from("/opt/dmm");
        let builder = LaunchCommandBuilder::new(&config);

        let record = ShortcutRecord::new("priconner", dir.path());
        let command = builder.build(Shortcut::Game(&record), false).unwrap();

        assert_eq!(command.executable, config.client_executable());
        assert_eq!(command.working_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_launcher_record() {
        let exe = NamedTempFile::new().unwrap();
        let config = AppConfig::default();
        let builder = LaunchCommandBuilder::new(&config);

        let mut record = LauncherShortcutRecord::new(exe.path());
        record.set_dgp_args(["--minimized"]);

        let command = builder.build(Shortcut::Launcher(&record), true).unwrap();
        assert_eq!(command.executable, exe.path());
        assert_eq!(command.arguments, ["--minimized"]);
        assert_eq!(command.working_dir.as_deref(), exe.path().parent());
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(split_arguments("  --a  b "), ["--a", "b"]);
        assert_eq!(split_arguments(r#"--name "two words" """#), ["--name", "two words", ""]);
        assert_eq!(split_arguments(r#"say \"hi\""#), ["say", "\"hi\""]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn test_split_backslashes() {
        assert_eq!(split_arguments(r"C:\Games\umamusume.exe"), [r"C:\Games\umamusume.exe"]);
        assert_eq!(split_arguments(r#""C:\Program Files\\""#), [r"C:\Program Files\"]);
        assert_eq!(split_arguments(r#"a\\\"b"#), [r#"a\"b"#]);
        assert_eq!(split_arguments(r#"a\\"b c" d"#), [r"a\b c", "d"]);
    }

    #[test]
    fn test_arguments_round_trip() {
        let cases: &[&[&str]] = &[
            &[r"C:\a\"],
            &[r"C:\Program Files\", "--flag"],
            &[r#"a"b"#],
            &[r#"x\"y"#],
            &[r"\\server\share\\", "", "two words"],
        ];
        for &args in cases {
            assert_eq!(split_arguments(&join_arguments(args)), args, "{:?}", args);
        }
    }

    #[test]
    fn test_join_arguments() {
        assert_eq!(join_arguments(&["--a", "b"]), "--a b");
        assert_eq!(join_arguments(&["two words", ""]), r#""two words" """#);
        assert_eq!(join_arguments(&[r#"a"b"#]), r#""a\"b""#);
        assert_eq!(join_arguments(&[r"C:\Program Files\"]), r#""C:\Program Files\\""#);
    }
}
