use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::catalog::{backup_path, Catalog};
use crate::config::model::RetentionPolicy;
use crate::error::{Result, RetentionError};
use crate::types::BackupName;

/// Backups selected for deletion out of `total` on the share.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetentionPlan {
    pub marked: Vec<BackupName>,
    pub total: usize,
}

impl RetentionPlan {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.marked.len() as f64 * 100.0 / self.total as f64
    }

    /// More than half of all backups would go.
    pub fn trips_safety_valve(&self) -> bool {
        self.marked.len() * 2 > self.total
    }
}

/// Marks every backup older than `max_age`, and every backup at index
/// `max_backups` or later in its VM's newest-first list.
pub fn plan(catalog: &Catalog, policy: RetentionPolicy, now: NaiveDateTime) -> RetentionPlan {
    let mut marked = Vec::new();
    for (vm, times) in catalog.iter() {
        for (index, created) in times.iter().enumerate() {
            let too_old = policy.max_age.is_some_and(|max| {
                (now - *created).to_std().unwrap_or(Duration::ZERO) > max
            });
            let too_many = policy.max_backups.is_some_and(|max| index >= max);
            if too_old || too_many {
                marked.push(BackupName::new(*created, vm));
            }
        }
    }
    RetentionPlan {
        marked,
        total: catalog.total(),
    }
}

/// Deletes the marked backups under `root` unless the safety valve trips.
/// Stops at the first deletion error. Returns the number deleted.
pub fn enforce(root: &Path, plan: &RetentionPlan) -> std::result::Result<usize, RetentionError> {
    if plan.marked.is_empty() {
        return Ok(0);
    }
    if plan.trips_safety_valve() {
        warn!(marked = plan.marked.len(), total = plan.total, "retention safety valve tripped");
        return Err(RetentionError::SafetyValve {
            percent: plan.percent(),
            marked: plan.marked.len(),
            total: plan.total,
        });
    }

    let mut deleted = 0;
    for name in &plan.marked {
        let target = backup_path(root, name);
        let delete_err = |source| RetentionError::Delete {
            path: target.display().to_string(),
            source,
        };
        let meta = fs::symlink_metadata(&target).map_err(delete_err)?;
        if meta.file_type().is_symlink() {
            println!("skip symlink delete: {}", target.display());
            continue;
        }
        println!("delete: {}", target.display());
        fs::remove_dir_all(&target).map_err(delete_err)?;
        info!(backup = %name, "expired backup deleted");
        deleted += 1;
    }
    Ok(deleted)
}

pub fn cleanup(root: &Path, policy: RetentionPolicy, now: NaiveDateTime) -> Result<usize> {
    let catalog = Catalog::scan(root)?;
    let plan = plan(&catalog, policy, now);
    Ok(enforce(root, &plan)?)
}
