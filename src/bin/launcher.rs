//! DMMGamePlayer Fast Launcher - command-line front end
//!
//! Usage:
//!   dgp_fast_launcher <shortcut> [--elevate]     Launch a game shortcut
//!   dgp_fast_launcher --launcher <shortcut>      Launch a launcher shortcut
//!   dgp_fast_launcher --add <shortcut> <product> [--folder]
//!                                                Add a shortcut (opens a file or folder picker)
//!   dgp_fast_launcher --remove <shortcut>        Remove a shortcut
//!   dgp_fast_launcher --list                     List shortcuts
//!   dgp_fast_launcher --schedule-check|--schedule-set|--schedule-delete|--schedule-run
//!   dgp_fast_launcher --reset                    Reset all settings
//!   dgp_fast_launcher --open-data                Open the data folder
//!
//! The elevation task starts this binary with `--elevated`. That instance
//! spawns the launch an unelevated instance handed off, then runs any action
//! that follows.

use anyhow::{bail, Context, Result};
use dgp_fast_launcher::config::{self, AppConfig};
use dgp_fast_launcher::elevation::{
    self, ScheduledElevationManager, SchtasksCli, TaskDefinition, ELEVATED_FLAG,
};
use dgp_fast_launcher::launch::{
    Handoff, LaunchOrchestrator, NotificationLevel, OsSpawner, ProcessSpawner,
};
use dgp_fast_launcher::picker::{pick_account_path, DialogPicker, PickKind};
use dgp_fast_launcher::shortcut::{Shortcut, ShortcutRecord};

#[derive(Debug, PartialEq)]
enum Action {
    Launch { name: String, elevate: bool },
    LaunchLauncher { name: String, elevate: bool },
    Add { name: String, product_id: String, folder: bool },
    Remove(String),
    List,
    ScheduleCheck,
    ScheduleSet,
    ScheduleDelete,
    ScheduleRun,
    Reset,
    OpenData,
    Idle,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = parse_args(&args)?;
    tracing::debug!("Action: {:?}", action);

    let mut config = config::load_config();
    let task = TaskDefinition::for_relaunch(config.relaunch())?;
    let elevation = ScheduledElevationManager::new(SchtasksCli::new(), task);
    let handoff = Handoff::in_data_dir()?;

    if args.iter().any(|a| a == ELEVATED_FLAG) {
        tracing::info!("Started by elevation task (elevated: {})", elevation::is_elevated());
        run_pending(&handoff, &OsSpawner)?;
    }

    match action {
        Action::Launch { name, elevate } => {
            let record = config
                .shortcut(&name)
                .with_context(|| format!("Unknown shortcut: {}", name))?;
            launch(&config, &elevation, &handoff, Shortcut::Game(record), elevate)?;
        }
        Action::LaunchLauncher { name, elevate } => {
            let record = config
                .launcher_shortcut(&name)
                .with_context(|| format!("Unknown launcher shortcut: {}", name))?;
            launch(&config, &elevation, &handoff, Shortcut::Launcher(record), elevate)?;
        }
        Action::Add {
            name,
            product_id,
            folder,
        } => {
            let kind = if folder {
                PickKind::Folder
            } else {
                PickKind::Executable
            };
            let path = pick_account_path(&DialogPicker, kind)?;
            config.add_shortcut(name.as_str(), ShortcutRecord::new(product_id, path));
            config::save_config(&config).context("Failed to save config")?;
            println!("Shortcut saved: {}", name);
        }
        Action::Remove(name) => {
            if config.remove_shortcut(&name).is_none() {
                bail!("Unknown shortcut: {}", name);
            }
            config::save_config(&config).context("Failed to save config")?;
            println!("Shortcut removed: {}", name);
        }
        Action::List => {
            for name in config.shortcut_names() {
                println!("{}", name);
            }
            for name in config.launcher_shortcut_names() {
                println!("{} (launcher)", name);
            }
        }
        Action::ScheduleCheck => {
            if elevation.check()? {
                println!("Elevation task is registered");
            } else {
                println!("Elevation task is not registered");
            }
        }
        Action::ScheduleSet => {
            elevation.set().context("Failed to register elevation task")?;
            println!("Elevation task registered");
        }
        Action::ScheduleDelete => {
            elevation.delete().context("Failed to delete elevation task")?;
            println!("Elevation task deleted");
        }
        Action::ScheduleRun => {
            elevation.ensure()?;
            elevation.run()?;
        }
        Action::Reset => {
            config::reset_config()?;
            println!("All settings reset");
        }
        Action::OpenData => config::open_data_folder()?,
        Action::Idle => {}
    }

    Ok(())
}

/// Spawn the launch handed off by an unelevated instance, if there is one
fn run_pending(handoff: &Handoff, spawner: &dyn ProcessSpawner) -> Result<Option<u32>> {
    let Some(command) = handoff.take().context("Failed to read pending launch")? else {
        tracing::info!("No pending launch");
        return Ok(None);
    };

    let pid = spawner
        .spawn(&command)
        .with_context(|| format!("Failed to start {}", command.executable.display()))?;
    println!("Started {} (pid {})", command.executable.display(), pid);
    Ok(Some(pid))
}

fn launch(
    config: &AppConfig,
    elevation: &ScheduledElevationManager<SchtasksCli>,
    handoff: &Handoff,
    shortcut: Shortcut<'_>,
    elevate: bool,
) -> Result<()> {
    let orchestrator = LaunchOrchestrator::new(config, elevation, OsSpawner, handoff);
    let report = orchestrator.launch(shortcut, elevate);
    let notification = report.notification();

    match notification.level {
        NotificationLevel::Info => {
            println!("{}", notification.message);
            Ok(())
        }
        NotificationLevel::Error => bail!("{}", notification.message),
    }
}

/// Parse command line arguments into one action
fn parse_args(args: &[String]) -> Result<Action> {
    let elevate = args.iter().any(|a| a == "--elevate");
    let folder = args.iter().any(|a| a == "--folder");
    let mut positional = args
        .iter()
        .filter(|a| !matches!(a.as_str(), "--elevate" | "--folder") && *a != ELEVATED_FLAG);

    let Some(first) = positional.next() else {
        return Ok(Action::Idle);
    };
    let mut value = |flag: &str| {
        positional
            .next()
            .cloned()
            .with_context(|| format!("{} needs a value", flag))
    };

    let action = match first.as_str() {
        "--launcher" => Action::LaunchLauncher {
            name: value("--launcher")?,
            elevate,
        },
        "--add" => Action::Add {
            name: value("--add")?,
            product_id: value("--add")?,
            folder,
        },
        "--remove" => Action::Remove(value("--remove")?),
        "--list" => Action::List,
        "--schedule-check" => Action::ScheduleCheck,
        "--schedule-set" => Action::ScheduleSet,
        "--schedule-delete" => Action::ScheduleDelete,
        "--schedule-run" => Action::ScheduleRun,
        "--reset" => Action::Reset,
        "--open-data" => Action::OpenData,
        flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
        name => Action::Launch {
            name: name.to_string(),
            elevate,
        },
    };

    Ok(action)
}
