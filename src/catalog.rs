use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{BackupError, Result};
use crate::types::BackupName;

/// Completed backups on the share, keyed by VM name. Each VM's timestamps
/// are sorted newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    backups: BTreeMap<String, Vec<NaiveDateTime>>,
}

impl Catalog {
    /// Reads the immediate subdirectories of `root`. Entries that are not
    /// directories or whose names do not parse are skipped.
    pub fn scan(root: &Path) -> Result<Self> {
        let entries = fs::read_dir(root)
            .map_err(|e| BackupError::message(format!("read {}: {}", root.display(), e)))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| BackupError::message(format!("read {}: {}", root.display(), e)))?;
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            match file_name.parse::<BackupName>() {
                Ok(name) => names.push(name),
                Err(reason) => debug!(entry = %file_name, %reason, "skipping share entry"),
            }
        }
        Ok(Self::from_names(names))
    }

    pub fn from_names(names: impl IntoIterator<Item = BackupName>) -> Self {
        let mut backups: BTreeMap<String, Vec<NaiveDateTime>> = BTreeMap::new();
        for name in names {
            backups
                .entry(name.vm().to_string())
                .or_default()
                .push(name.created());
        }
        for times in backups.values_mut() {
            times.sort_by(|a, b| b.cmp(a));
        }
        Catalog { backups }
    }

    pub fn backups_for(&self, vm: &str) -> &[NaiveDateTime] {
        self.backups.get(vm).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest(&self, vm: &str) -> Option<NaiveDateTime> {
        self.backups_for(vm).first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NaiveDateTime])> {
        self.backups.iter().map(|(vm, times)| (vm.as_str(), times.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.backups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }
}

pub fn backup_path(root: &Path, name: &BackupName) -> PathBuf {
    root.join(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn scan_groups_and_sorts_newest_first() {
        let dir = TempDir::new().expect("tempdir");
        for name in [
            "2024-05-01_18-00-00 web01",
            "2024-05-03_18-00-00 web01",
            "2024-05-02_18-00-00 web01",
            "2024-05-02_19-00-00 db 01",
        ] {
            fs::create_dir(dir.path().join(name)).expect("mkdir");
        }
        let catalog = Catalog::scan(dir.path()).expect("scan");
        assert_eq!(catalog.backups_for("web01"), &[at(3, 18), at(2, 18), at(1, 18)]);
        assert_eq!(catalog.latest("db 01"), Some(at(2, 19)));
        assert_eq!(catalog.total(), 4);
    }

    #[test]
    fn scan_skips_unrelated_entries() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir(dir.path().join("lost+found")).expect("mkdir");
        fs::create_dir(dir.path().join("2024-05-01_18-00-00")).expect("mkdir");
        fs::write(dir.path().join("2024-05-01_18-00-00 notes"), b"file").expect("write");
        fs::create_dir(dir.path().join("2024-05-01_18-00-00 web01")).expect("mkdir");

        let catalog = Catalog::scan(dir.path()).expect("scan");
        assert_eq!(catalog.total(), 1);
        assert!(catalog.backups_for("notes").is_empty());
    }

    #[test]
    fn scan_reflects_latest_disk_state() {
        let dir = TempDir::new().expect("tempdir");
        assert!(Catalog::scan(dir.path()).expect("scan").is_empty());
        fs::create_dir(dir.path().join("2024-05-01_18-00-00 web01")).expect("mkdir");
        assert_eq!(Catalog::scan(dir.path()).expect("scan").total(), 1);
    }

    #[test]
    fn scan_of_missing_root_fails() {
        let dir = TempDir::new().expect("tempdir");
        assert!(Catalog::scan(&dir.path().join("gone")).is_err());
    }
}
