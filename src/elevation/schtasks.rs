//! Scheduler adapter backed by `schtasks.exe`
//!
//! Tasks are registered from an XML document so the highest run level, the
//! hidden flag and the on-demand start policy can all be set in one call.
//!
//! Outcomes are decided by exit codes only. `schtasks` writes its messages in
//! the console codepage of the user's locale, so its text is only logged.
//! `schtasks /query` exits with 1 both for a missing task and for a real
//! failure, so lookups go through `Get-ScheduledTask` instead, which reports
//! "not found" with its own exit code.

use super::{TaskDefinition, TaskScheduler};
use crate::error::{LaunchError, Result};
use crate::launch::join_arguments;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Exit code of the lookup script when the task exists
const QUERY_FOUND: i32 = 0;
/// Exit code of the lookup script when the task does not exist
const QUERY_NOT_FOUND: i32 = 3;

pub struct SchtasksCli {
    schtasks: PathBuf,
    powershell: PathBuf,
}

impl Default for SchtasksCli {
    fn default() -> Self {
        Self {
            schtasks: PathBuf::from("schtasks"),
            powershell: PathBuf::from("powershell"),
        }
    }
}

impl SchtasksCli {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(program: &Path) -> Command {
        let mut cmd = Command::new(program);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::CREATE_NO_WINDOW;
            cmd.creation_flags(CREATE_NO_WINDOW.0);
        }

        cmd
    }

    fn invoke(&self, program: &Path, args: &[&str]) -> Result<Output> {
        debug!("{} {}", program.display(), args.join(" "));

        Self::command(program).args(args).output().map_err(|e| {
            LaunchError::elevation(
                format!("Failed to run {:?}: {}", program, e),
                e.raw_os_error(),
            )
        })
    }
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn failure(action: &str, name: &str, output: &Output) -> LaunchError {
    LaunchError::elevation(
        format!("{} {:?} failed: {}", action, name, stderr_text(output)),
        output.status.code(),
    )
}

/// Split `\Folder\Name` into the scheduler's task path `\Folder\` and `Name`
fn split_task_name(name: &str) -> (&str, &str) {
    match name.rfind('\\') {
        Some(i) => (&name[..=i], &name[i + 1..]),
        None => ("\\", name),
    }
}

/// Quote a value as a PowerShell single-quoted string
fn ps_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// PowerShell lookup that exits with [`QUERY_FOUND`], [`QUERY_NOT_FOUND`], or
/// 4 for any other failure
fn query_script(name: &str) -> String {
    let (path, leaf) = split_task_name(name);
    format!(
        "try {{ Get-ScheduledTask -TaskPath {} -TaskName {} -ErrorAction Stop | Out-Null; exit {} }} \
         catch {{ if ($_.CategoryInfo.Category -eq 'ObjectNotFound') {{ exit {} }} \
         [Console]::Error.WriteLine($_.Exception.Message); exit 4 }}",
        ps_literal(path),
        ps_literal(leaf),
        QUERY_FOUND,
        QUERY_NOT_FOUND,
    )
}

impl TaskScheduler for SchtasksCli {
    fn query(&self, name: &str) -> Result<bool> {
        let script = query_script(name);
        let output = self.invoke(
            &self.powershell,
            &["-NoProfile", "-NonInteractive", "-Command", &script],
        )?;

        match output.status.code() {
            Some(QUERY_FOUND) => Ok(true),
            Some(QUERY_NOT_FOUND) => {
                debug!("Task {:?} not found", name);
                Ok(false)
            }
            _ => Err(failure("Get-ScheduledTask", name, &output)),
        }
    }

    fn create(&self, task: &TaskDefinition) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("dgp-task-")
            .suffix(".xml")
            .tempfile()
            .map_err(|e| {
                LaunchError::elevation(format!("Failed to create task file: {}", e), e.raw_os_error())
            })?;

        // schtasks reads the document as UTF-16 with a byte order mark
        let mut bytes = vec![0xFF, 0xFE];
        for unit in task_xml(task).encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        file.write_all(&bytes).map_err(|e| {
            LaunchError::elevation(format!("Failed to write task file: {}", e), e.raw_os_error())
        })?;

        let xml_path = file.path().to_string_lossy().to_string();
        let output = self.invoke(
            &self.schtasks,
            &["/create", "/tn", &task.name, "/xml", &xml_path, "/f"],
        )?;
        if !output.status.success() {
            return Err(failure("schtasks /create", &task.name, &output));
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let output = self.invoke(&self.schtasks, &["/delete", "/tn", name, "/f"])?;
        if output.status.success() {
            return Ok(true);
        }

        if self.query(name)? {
            warn!("Task {:?} still registered after delete", name);
            return Err(failure("schtasks /delete", name, &output));
        }
        Ok(false)
    }

    fn run(&self, name: &str) -> Result<()> {
        let output = self.invoke(&self.schtasks, &["/run", "/tn", name])?;
        if !output.status.success() {
            return Err(failure("schtasks /run", name, &output));
        }
        Ok(())
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Task Scheduler 1.2 document: one time trigger, highest run level, hidden,
/// startable on demand, no execution time limit
pub fn task_xml(task: &TaskDefinition) -> String {
    let command = escape_xml(&task.executable.to_string_lossy());
    let arguments = escape_xml(&join_arguments(&task.arguments));
    let working_dir = task
        .executable
        .parent()
        .map(|dir| escape_xml(&dir.to_string_lossy()))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-16"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo>
    <URI>{uri}</URI>
  </RegistrationInfo>
  <Triggers>
    <TimeTrigger>
      <StartBoundary>2000-01-01T00:00:00</StartBoundary>
      <Enabled>true</Enabled>
    </TimeTrigger>
  </Triggers>
  <Principals>
    <Principal id="Author">
      <LogonType>InteractiveToken</LogonType>
      <RunLevel>HighestAvailable</RunLevel>
    </Principal>
  </Principals>
  <Settings>
    <MultipleInstancesPolicy>Parallel</MultipleInstancesPolicy>
    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>
    <StopIfGoingOnBatteries>false</StopIfGoingOnBatteries>
    <AllowHardTerminate>false</AllowHardTerminate>
    <StartWhenAvailable>false</StartWhenAvailable>
    <RunOnlyIfNetworkAvailable>false</RunOnlyIfNetworkAvailable>
    <AllowStartOnDemand>true</AllowStartOnDemand>
    <Enabled>true</Enabled>
    <Hidden>true</Hidden>
    <ExecutionTimeLimit>PT0S</ExecutionTimeLimit>
    <Priority>7</Priority>
  </Settings>
  <Actions Context="Author">
    <Exec>
      <Command>{command}</Command>
      <Arguments>{arguments}</Arguments>
      <WorkingDirectory>{working_dir}</WorkingDirectory>
    </Exec>
  </Actions>
</Task>
"#,
        uri = escape_xml(&task.name),
    )
}
