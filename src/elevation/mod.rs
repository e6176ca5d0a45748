//! Elevation via a scheduled task
//!
//! A single task with a fixed name is registered in the OS scheduler with
//! "run with highest privileges". Once it exists the launcher can relaunch
//! itself elevated by triggering the task, with no consent prompt per run.
//!
//! Nothing about the task is cached here: every call goes to the scheduler.

mod schtasks;

pub use schtasks::{task_xml, SchtasksCli};

use crate::error::{LaunchError, Result};
use crate::shortcut::LauncherShortcutRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the elevation task in the OS scheduler
pub const DEFAULT_TASK_NAME: &str = r"\DMMGamePlayerFastLauncher\DMMGamePlayerSkipUAC";

/// First argument the elevation task passes when it relaunches the launcher
pub const ELEVATED_FLAG: &str = "--elevated";

/// What the elevation task runs. The task name is always [`DEFAULT_TASK_NAME`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    name: String,
    executable: PathBuf,
    arguments: Vec<String>,
}

impl TaskDefinition {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            name: DEFAULT_TASK_NAME.to_string(),
            executable: executable.into(),
            arguments: Vec::new(),
        }
    }

    /// Task that relaunches the running executable
    pub fn for_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            LaunchError::elevation(
                format!("Failed to resolve current executable: {}", e),
                e.raw_os_error(),
            )
        })?;
        Ok(Self::new(exe))
    }

    /// Task that relaunches the launcher as described by `relaunch`.
    ///
    /// An empty path means the running executable. The task always passes
    /// [`ELEVATED_FLAG`] first, followed by the record's arguments.
    pub fn for_relaunch(relaunch: &LauncherShortcutRecord) -> Result<Self> {
        let task = if relaunch.account_path().as_os_str().is_empty() {
            Self::for_current_exe()?
        } else {
            Self::new(relaunch.account_path())
        };

        let arguments = std::iter::once(ELEVATED_FLAG.to_string())
            .chain(relaunch.dgp_args().iter().cloned());
        Ok(task.with_arguments(arguments))
    }

    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

/// OS scheduler operations used by the elevation manager
pub trait TaskScheduler {
    /// Whether a task with this name is registered
    fn query(&self, name: &str) -> Result<bool>;

    /// Register the task, replacing an existing one with the same name
    fn create(&self, task: &TaskDefinition) -> Result<()>;

    /// Remove the task. Returns false if there was nothing to remove.
    fn delete(&self, name: &str) -> Result<bool>;

    /// Start the task now
    fn run(&self, name: &str) -> Result<()>;
}

impl<T: TaskScheduler + ?Sized> TaskScheduler for &T {
    fn query(&self, name: &str) -> Result<bool> {
        (**self).query(name)
    }

    fn create(&self, task: &TaskDefinition) -> Result<()> {
        (**self).create(task)
    }

    fn delete(&self, name: &str) -> Result<bool> {
        (**self).delete(name)
    }

    fn run(&self, name: &str) -> Result<()> {
        (**self).run(name)
    }
}

/// Manages the one elevation task
pub struct ScheduledElevationManager<S> {
    scheduler: S,
    task: TaskDefinition,
}

impl<S: TaskScheduler> ScheduledElevationManager<S> {
    pub fn new(scheduler: S, task: TaskDefinition) -> Self {
        Self { scheduler, task }
    }

    pub fn task(&self) -> &TaskDefinition {
        &self.task
    }

    /// Whether the task is registered. "Not found" is `Ok(false)`.
    pub fn check(&self) -> Result<bool> {
        let exists = self.scheduler.query(&self.task.name)?;
        debug!("Elevation task {:?} registered: {}", self.task.name, exists);
        Ok(exists)
    }

    /// Create or overwrite the task
    pub fn set(&self) -> Result<()> {
        self.scheduler.create(&self.task)?;
        info!(
            "Elevation task {:?} registered for {:?}",
            self.task.name, self.task.executable
        );
        Ok(())
    }

    /// Remove the task. Already absent counts as success.
    pub fn delete(&self) -> Result<()> {
        if self.scheduler.delete(&self.task.name)? {
            info!("Elevation task {:?} deleted", self.task.name);
        } else {
            debug!("Elevation task {:?} was not registered", self.task.name);
        }
        Ok(())
    }

    /// Register the task unless it already exists
    pub fn ensure(&self) -> Result<()> {
        if !self.check()? {
            self.set()?;
        }
        Ok(())
    }

    /// Trigger the task, relaunching its executable elevated
    pub fn run(&self) -> Result<()> {
        self.scheduler.run(&self.task.name)?;
        info!("Elevation task {:?} triggered", self.task.name);
        Ok(())
    }
}

/// Whether the current process runs with an elevated token
#[cfg(windows)]
pub fn is_elevated() -> bool {
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    unsafe {
        let mut token = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut returned = 0u32;
        let queried = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut TOKEN_ELEVATION as *mut std::ffi::c_void),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut returned,
        )
        .is_ok();

        let _ = CloseHandle(token);
        queried && elevation.TokenIsElevated != 0
    }
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    false
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory scheduler that records calls and can refuse registration
    #[derive(Default)]
    pub struct FakeScheduler {
        pub registered: RefCell<Option<TaskDefinition>>,
        pub deny_create: bool,
        pub deny_run: bool,
        pub queries: Cell<usize>,
        pub creates: Cell<usize>,
        pub runs: Cell<usize>,
    }

    impl FakeScheduler {
        pub fn denying() -> Self {
            Self {
                deny_create: true,
                ..Self::default()
            }
        }

        pub fn denying_run(task: TaskDefinition) -> Self {
            Self {
                deny_run: true,
                ..Self::with_task(task)
            }
        }

        pub fn with_task(task: TaskDefinition) -> Self {
            Self {
                registered: RefCell::new(Some(task)),
                ..Self::default()
            }
        }
    }

    impl TaskScheduler for FakeScheduler {
        fn query(&self, name: &str) -> Result<bool> {
            self.queries.set(self.queries.get() + 1);
            Ok(self
                .registered
                .borrow()
                .as_ref()
                .is_some_and(|t| t.name == name))
        }

        fn create(&self, task: &TaskDefinition) -> Result<()> {
            self.creates.set(self.creates.get() + 1);
            if self.deny_create {
                return Err(LaunchError::elevation("Access is denied.", Some(5)));
            }
            *self.registered.borrow_mut() = Some(task.clone());
            Ok(())
        }

        fn delete(&self, name: &str) -> Result<bool> {
            let mut registered = self.registered.borrow_mut();
            if registered.as_ref().is_some_and(|t| t.name == name) {
                *registered = None;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        fn run(&self, name: &str) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            if self.deny_run {
                return Err(LaunchError::elevation("The operator or administrator has refused the request.", Some(1)));
            }
            if self.query(name)? {
                Ok(())
            } else {
                Err(LaunchError::elevation("task not found", Some(1)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeScheduler;
    use super::*;
    use crate::error::ErrorKind;

    fn manager(scheduler: &FakeScheduler) -> ScheduledElevationManager<&FakeScheduler> {
        let task = TaskDefinition::new(r"C:\Tools\dgp_fast_launcher.exe")
            .with_arguments([ELEVATED_FLAG]);
        ScheduledElevationManager::new(scheduler, task)
    }

    #[test]
    fn test_set_then_check() {
        let scheduler = FakeScheduler::default();
        let elevation = manager(&scheduler);

        assert!(!elevation.check().unwrap());
        elevation.set().unwrap();
        assert!(elevation.check().unwrap());
    }

    #[test]
    fn test_set_twice_is_idempotent() {
        let scheduler = FakeScheduler::default();
        let elevation = manager(&scheduler);

        elevation.set().unwrap();
        assert!(elevation.check().unwrap());
        elevation.set().unwrap();
        assert!(elevation.check().unwrap());
        assert_eq!(scheduler.creates.get(), 2);
    }

    #[test]
    fn test_delete_when_absent() {
        let scheduler = FakeScheduler::default();
        let elevation = manager(&scheduler);

        elevation.delete().unwrap();
        assert!(!elevation.check().unwrap());
    }

    #[test]
    fn test_delete_then_check() {
        let scheduler = FakeScheduler::default();
        let elevation = manager(&scheduler);

        elevation.set().unwrap();
        elevation.delete().unwrap();
        assert!(!elevation.check().unwrap());
    }

    #[test]
    fn test_ensure_only_creates_once() {
        let scheduler = FakeScheduler::default();
        let elevation = manager(&scheduler);

        elevation.ensure().unwrap();
        elevation.ensure().unwrap();
        assert_eq!(scheduler.creates.get(), 1);
        assert_eq!(
            scheduler.registered.borrow().as_ref().unwrap().arguments(),
            [ELEVATED_FLAG]
        );
    }

    #[test]
    fn test_set_denied() {
        let scheduler = FakeScheduler::denying();
        let elevation = manager(&scheduler);

        let err = elevation.set().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ElevationSetup);
        assert_eq!(err.os_code(), Some(5));
        assert!(!elevation.check().unwrap());
    }

    #[test]
    fn test_run_requires_task() {
        let scheduler = FakeScheduler::default();
        let elevation = manager(&scheduler);

        assert!(elevation.run().is_err());
        elevation.ensure().unwrap();
        elevation.run().unwrap();
    }

    #[test]
    fn test_relaunch_task_uses_fixed_name() {
        let mut relaunch = LauncherShortcutRecord::default();
        relaunch.set_account_path(r"C:\Tools\dgp_fast_launcher.exe");
        relaunch.set_dgp_args(["--minimized"]);

        let task = TaskDefinition::for_relaunch(&relaunch).unwrap();
        assert_eq!(task.name(), DEFAULT_TASK_NAME);
        assert_eq!(task.executable(), Path::new(r"C:\Tools\dgp_fast_launcher.exe"));
        assert_eq!(task.arguments(), [ELEVATED_FLAG, "--minimized"]);
    }

    #[test]
    fn test_relaunch_defaults_to_current_exe() {
        let task = TaskDefinition::for_relaunch(&LauncherShortcutRecord::default()).unwrap();
        assert_eq!(task.executable(), std::env::current_exe().unwrap());
        assert_eq!(task.arguments(), [ELEVATED_FLAG]);
    }
}
