use std::path::{Path, PathBuf};

use crate::error::{BackupError, Result};

/// A single path component: non-empty, not `.`/`..`, no separators or
/// control characters.
pub fn is_safe_name(name: &str) -> bool {
    if name.trim().is_empty() || name == "." || name == ".." {
        return false;
    }
    !name.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Location of a backup folder directly under the share root.
pub fn share_folder(root: &Path, name: &str) -> Result<PathBuf> {
    if !is_safe_name(name) {
        return Err(BackupError::message(format!(
            "backup name {:?} must be a single folder name",
            name
        )));
    }
    Ok(root.join(name))
}
