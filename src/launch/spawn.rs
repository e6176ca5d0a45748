//! Process spawning

use super::LaunchCommand;
use std::io;
use std::process::{Command, Stdio};
use tracing::debug;

/// Starts a process from a launch command and returns its pid
pub trait ProcessSpawner {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32>;
}

impl<T: ProcessSpawner + ?Sized> ProcessSpawner for &T {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32> {
        (**self).spawn(command)
    }
}

/// Spawns detached processes through `std::process::Command`.
/// The child is not waited on or monitored.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSpawner;

impl ProcessSpawner for OsSpawner {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32> {
        let mut cmd = Command::new(&command.executable);
        cmd.args(&command.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Some(ref dir) = command.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::{CREATE_NEW_PROCESS_GROUP, DETACHED_PROCESS};
            cmd.creation_flags((CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS).0);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn()?;
        debug!("Spawned {:?} (pid {})", command.executable, child.id());
        Ok(child.id())
    }
}
