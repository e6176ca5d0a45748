//! Launch orchestration
//!
//! One call to [`LaunchOrchestrator::launch`] walks a small state machine:
//!
//! ```text
//! Start -> Validated -> [ElevationChecked -> [ElevationEnsuring]] -> Spawning   -> Launched
//!                                                                 \-> HandingOff -> Launched
//!                  any step -> Failed(kind)
//! ```
//!
//! An elevated launch from an unelevated process is handed off: the built
//! command is parked in the [`Handoff`] file and the elevation task is run.
//! The task relaunches this program elevated, which takes the command and
//! spawns it. Nothing is spawned directly in that case.
//!
//! Errors never escape as panics or raw OS errors; they end up in the
//! returned [`LaunchReport`], which the front end turns into a notification.
//! Nothing is retried automatically, and a registered elevation task is left
//! in place when the spawn after it fails.

use super::{Handoff, LaunchCommand, LaunchCommandBuilder, ProcessSpawner};
use crate::config::AppConfig;
use crate::elevation::{is_elevated, ScheduledElevationManager, TaskScheduler};
use crate::error::{ErrorKind, LaunchError, Result};
use crate::shortcut::Shortcut;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Start,
    Validated,
    ElevationChecked,
    ElevationEnsuring,
    Spawning,
    HandingOff,
    Launched,
    Failed(ErrorKind),
}

/// A successfully started process, or a command handed to the elevation task
#[derive(Debug, Clone)]
pub struct Launched {
    /// `None` when the command was handed off
    pub pid: Option<u32>,
    pub command: LaunchCommand,
}

impl Launched {
    pub fn handed_off(&self) -> bool {
        self.pid.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// User-facing summary of a launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// States visited by one launch and how it ended
#[derive(Debug)]
pub struct LaunchReport {
    pub states: Vec<LaunchState>,
    pub outcome: Result<Launched>,
}

impl LaunchReport {
    pub fn final_state(&self) -> LaunchState {
        self.states.last().copied().unwrap_or(LaunchState::Start)
    }

    pub fn is_launched(&self) -> bool {
        self.final_state() == LaunchState::Launched
    }

    pub fn notification(&self) -> Notification {
        match &self.outcome {
            Ok(launched) => {
                let executable = launched.command.executable.display();
                let message = match launched.pid {
                    Some(pid) => format!("Started {} (pid {})", executable, pid),
                    None => format!("Handed {} to the elevation task", executable),
                };
                Notification {
                    level: NotificationLevel::Info,
                    message,
                }
            }
            Err(e) => {
                let message = match e.os_code() {
                    Some(code) => format!("{} (code {})", e, code),
                    None => e.to_string(),
                };
                Notification {
                    level: NotificationLevel::Error,
                    message,
                }
            }
        }
    }
}

pub struct LaunchOrchestrator<'a, S, P> {
    config: &'a AppConfig,
    elevation: &'a ScheduledElevationManager<S>,
    spawner: P,
    handoff: &'a Handoff,
    elevated: bool,
}

impl<'a, S: TaskScheduler, P: ProcessSpawner> LaunchOrchestrator<'a, S, P> {
    pub fn new(
        config: &'a AppConfig,
        elevation: &'a ScheduledElevationManager<S>,
        spawner: P,
        handoff: &'a Handoff,
    ) -> Self {
        Self {
            config,
            elevation,
            spawner,
            handoff,
            elevated: is_elevated(),
        }
    }

    /// Override whether this process already holds an elevated token
    pub fn running_elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn launch<'r>(&self, shortcut: impl Into<Shortcut<'r>>, require_elevation: bool) -> LaunchReport {
        let shortcut = shortcut.into();
        let mut states = vec![LaunchState::Start];

        let outcome = self.run(shortcut, require_elevation, &mut states);
        match &outcome {
            Ok(launched) => {
                match launched.pid {
                    Some(pid) => info!("Launched {} (pid {})", launched.command, pid),
                    None => info!("Handed off {}", launched.command),
                }
                states.push(LaunchState::Launched);
            }
            Err(e) => {
                error!("Launch of {:?} failed: {}", shortcut.account_path(), e);
                states.push(LaunchState::Failed(e.kind()));
            }
        }

        LaunchReport { states, outcome }
    }

    fn run(
        &self,
        shortcut: Shortcut<'_>,
        require_elevation: bool,
        states: &mut Vec<LaunchState>,
    ) -> Result<Launched> {
        let builder = LaunchCommandBuilder::new(self.config);

        builder.validate(shortcut)?;
        states.push(LaunchState::Validated);

        if require_elevation {
            let registered = self.elevation.check()?;
            states.push(LaunchState::ElevationChecked);

            if !registered {
                debug!("Elevation task missing, registering");
                states.push(LaunchState::ElevationEnsuring);
                self.elevation.set()?;
            }
        }

        let command = builder.build(shortcut, require_elevation)?;

        if require_elevation && !self.elevated {
            states.push(LaunchState::HandingOff);
            self.hand_off(&command)?;
            return Ok(Launched { pid: None, command });
        }

        states.push(LaunchState::Spawning);
        let pid = self
            .spawner
            .spawn(&command)
            .map_err(|source| LaunchError::Spawn {
                executable: command.executable.clone(),
                source,
            })?;

        Ok(Launched {
            pid: Some(pid),
            command,
        })
    }

    fn hand_off(&self, command: &LaunchCommand) -> Result<()> {
        self.handoff.store(command).map_err(|e| {
            LaunchError::elevation(format!("Failed to hand off launch: {}", e), e.os_code())
        })?;

        if let Err(e) = self.elevation.run() {
            if let Err(clear) = self.handoff.clear() {
                warn!("Failed to clear pending launch: {}", clear);
            }
            return Err(e);
        }
        Ok(())
    }
}
