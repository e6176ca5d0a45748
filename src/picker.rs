/// Native dialogs for choosing a shortcut target
use crate::error::{LaunchError, Result};
use std::path::PathBuf;

/// What kind of entry the user should pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    Executable,
    Folder,
}

/// Source of user-chosen paths. `None` means the user cancelled.
pub trait PathPicker {
    fn pick(&self, kind: PickKind) -> Option<PathBuf>;
}

/// rfd-backed dialogs
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogPicker;

impl PathPicker for DialogPicker {
    fn pick(&self, kind: PickKind) -> Option<PathBuf> {
        use rfd::FileDialog;

        match kind {
            PickKind::Executable => FileDialog::new()
                .add_filter("Executable", &["exe"])
                .add_filter("All Files", &["*"])
                .pick_file(),
            PickKind::Folder => FileDialog::new().pick_folder(),
        }
    }
}

/// Ask for a shortcut target and make sure it exists
pub fn pick_account_path(picker: &dyn PathPicker, kind: PickKind) -> Result<PathBuf> {
    let path = picker
        .pick(kind)
        .ok_or_else(|| LaunchError::config("No path selected"))?;

    if !path.exists() {
        return Err(LaunchError::InvalidShortcut { path });
    }
    Ok(path)
}
