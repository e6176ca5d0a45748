//! Launching shortcuts: command construction, process spawning and the
//! orchestration that ties them to the elevation task.

mod command;
mod handoff;
mod orchestrator;
mod spawn;

pub use command::{
    join_arguments, split_arguments, LaunchCommand, LaunchCommandBuilder, AUTO_UPDATE_FLAG,
    GAME_TYPE_FLAG, PRODUCT_FLAG, RICH_PRESENCE_FLAG,
};
pub use handoff::{Handoff, HANDOFF_FILE};
pub use orchestrator::{
    LaunchOrchestrator, LaunchReport, LaunchState, Launched, Notification, NotificationLevel,
};
pub use spawn::{OsSpawner, ProcessSpawner};
