//! Shortcut Records
//!
//! Defines the persisted descriptions of launchable targets:
//! - ShortcutRecord: a game shortcut (product id, target path, flags, client mode)
//! - LauncherShortcutRecord: a relaunch of the launcher itself
//! - GameType: the closed set of client modes a game can be started in
//! - Shortcut: a borrowed, read-only view handed to the launch subsystem

use crate::error::LaunchError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Client mode a game is started in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameType {
    /// General client
    #[default]
    Gcl,
    /// Adult client
    Acl,
}

impl GameType {
    pub const ALL: [GameType; 2] = [GameType::Gcl, GameType::Acl];

    /// Tag used in config.json and on the client command line
    pub fn tag(&self) -> &'static str {
        match self {
            GameType::Gcl => "GCL",
            GameType::Acl => "ACL",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for GameType {
    type Err = LaunchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        GameType::ALL
            .into_iter()
            .find(|t| t.tag() == value)
            .ok_or_else(|| LaunchError::UnsupportedGameType {
                value: value.to_string(),
            })
    }
}

fn default_true() -> bool {
    true
}

fn default_game_type() -> String {
    GameType::default().tag().to_string()
}

/// Accepts either a JSON list of tokens or a single command-line string
fn arguments<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Arguments {
        List(Vec<String>),
        Line(String),
    }

    Ok(match Arguments::deserialize(deserializer)? {
        Arguments::List(tokens) => tokens,
        Arguments::Line(line) => crate::launch::split_arguments(&line),
    })
}

/// A game shortcut as stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutRecord {
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    account_path: PathBuf,
    #[serde(default, rename = "game_args", deserialize_with = "arguments")]
    launch_arguments: Vec<String>,
    #[serde(default = "default_true")]
    auto_update: bool,
    /// Kept as the raw tag so unknown values surface at launch time
    #[serde(default = "default_game_type")]
    game_type: String,
    #[serde(default = "default_true")]
    rich_presence: bool,
}

impl Default for ShortcutRecord {
    fn default() -> Self {
        Self {
            product_id: String::new(),
            account_path: PathBuf::new(),
            launch_arguments: Vec::new(),
            auto_update: true,
            game_type: default_game_type(),
            rich_presence: true,
        }
    }
}

impl ShortcutRecord {
    pub fn new(product_id: impl Into<String>, account_path: impl Into<PathBuf>) -> Self {
        Self {
            product_id: product_id.into(),
            account_path: account_path.into(),
            ..Self::default()
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn account_path(&self) -> &Path {
        &self.account_path
    }

    pub fn launch_arguments(&self) -> &[String] {
        &self.launch_arguments
    }

    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    pub fn rich_presence(&self) -> bool {
        self.rich_presence
    }

    /// Raw game type tag as persisted
    pub fn game_type_tag(&self) -> &str {
        &self.game_type
    }

    /// Parse the persisted tag into a known client mode
    pub fn game_type(&self) -> Result<GameType, LaunchError> {
        self.game_type.parse()
    }

    pub fn set_product_id(&mut self, product_id: impl Into<String>) {
        self.product_id = product_id.into();
    }

    pub fn set_account_path(&mut self, path: impl Into<PathBuf>) {
        self.account_path = path.into();
    }

    pub fn set_launch_arguments<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launch_arguments = args.into_iter().map(Into::into).collect();
    }

    pub fn set_auto_update(&mut self, enabled: bool) {
        self.auto_update = enabled;
    }

    pub fn set_rich_presence(&mut self, enabled: bool) {
        self.rich_presence = enabled;
    }

    pub fn set_game_type(&mut self, game_type: GameType) {
        self.game_type = game_type.tag().to_string();
    }

    /// Store a tag as-is. Unknown tags are rejected when the command is built.
    pub fn set_game_type_tag(&mut self, tag: impl Into<String>) {
        self.game_type = tag.into();
    }
}

/// Relaunch description for the launcher's own executable
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LauncherShortcutRecord {
    #[serde(default)]
    account_path: PathBuf,
    #[serde(default, deserialize_with = "arguments")]
    dgp_args: Vec<String>,
}

impl LauncherShortcutRecord {
    pub fn new(account_path: impl Into<PathBuf>) -> Self {
        Self {
            account_path: account_path.into(),
            dgp_args: Vec::new(),
        }
    }

    pub fn account_path(&self) -> &Path {
        &self.account_path
    }

    pub fn dgp_args(&self) -> &[String] {
        &self.dgp_args
    }

    pub fn set_account_path(&mut self, path: impl Into<PathBuf>) {
        self.account_path = path.into();
    }

    pub fn set_dgp_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dgp_args = args.into_iter().map(Into::into).collect();
    }
}

/// Read-only view of a record for one launch
#[derive(Debug, Clone, Copy)]
pub enum Shortcut<'a> {
    Game(&'a ShortcutRecord),
    Launcher(&'a LauncherShortcutRecord),
}

impl Shortcut<'_> {
    pub fn account_path(&self) -> &Path {
        match self {
            Shortcut::Game(record) => record.account_path(),
            Shortcut::Launcher(record) => record.account_path(),
        }
    }
}

impl<'a> From<&'a ShortcutRecord> for Shortcut<'a> {
    fn from(record: &'a ShortcutRecord) -> Self {
        Shortcut::Game(record)
    }
}

impl<'a> From<&'a LauncherShortcutRecord> for Shortcut<'a> {
    fn from(record: &'a LauncherShortcutRecord) -> Self {
        Shortcut::Launcher(record)
    }
}
