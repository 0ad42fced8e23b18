use std::path::Path;
use std::time::Duration;

use walkdir::WalkDir;

use crate::error::{BackupError, Result};
use crate::queue::BackupAge;

/// Total size of the `.qcow2` disk images under one backup directory.
pub fn backup_size(dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| BackupError::message(format!("walk {}: {}", dir.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_disk = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("qcow2"))
            .unwrap_or(false);
        if is_disk {
            total += entry.metadata().map_err(|e| BackupError::message(e.to_string()))?.len();
        }
    }
    Ok(total)
}

pub fn human_size(bytes: u64) -> String {
    let units = ["B", "kB", "MB", "GB", "TB", "PB"];
    let mut value = bytes as f64;
    let mut idx = 0usize;
    while value >= 1000.0 && idx + 1 < units.len() {
        value /= 1000.0;
        idx += 1;
    }
    if idx == 0 {
        format!("{} {}", bytes, units[idx])
    } else if value < 10.0 {
        format!("{:.1} {}", value, units[idx])
    } else {
        format!("{:.0} {}", value, units[idx])
    }
}

/// Coarse age for listings, e.g. "3 days 4 hours".
pub fn describe_age(age: BackupAge) -> String {
    match age {
        BackupAge::Never => "never backed up".to_string(),
        BackupAge::Since(age) => describe_duration(age),
    }
}

fn describe_duration(age: Duration) -> String {
    let secs = age.as_secs();
    let parts = [
        (secs / 86_400, "day"),
        ((secs % 86_400) / 3600, "hour"),
        ((secs % 3600) / 60, "minute"),
    ];
    let words: Vec<String> = parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .take(2)
        .map(|(n, unit)| format!("{} {}{}", n, unit, if *n == 1 { "" } else { "s" }))
        .collect();
    if words.is_empty() {
        "less than a minute".to_string()
    } else {
        words.join(" ")
    }
}
