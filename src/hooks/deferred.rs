use std::path::Path;

use tracing::{info, warn};

use crate::error::HookError;
use crate::hooks::{backup_vars, HookKind, HookRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedHook {
    pub vm: String,
    pub backup: String,
}

/// Post-backup hooks held back until the end of a scheduled run.
#[derive(Debug, Default)]
pub struct DeferredHooks {
    entries: Vec<DelayedHook>,
}

impl DeferredHooks {
    pub fn push(&mut self, vm: &str, backup: &str) {
        self.entries.push(DelayedHook {
            vm: vm.to_string(),
            backup: backup.to_string(),
        });
    }

    pub fn entries(&self) -> &[DelayedHook] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every queued hook in insertion order and empties the queue.
    /// All hooks run even if some fail; the first failure is returned.
    pub fn flush(&mut self, runner: &dyn HookRunner, local_path: &Path) -> Result<(), HookError> {
        let entries = std::mem::take(&mut self.entries);
        if !entries.is_empty() {
            info!(count = entries.len(), "running delayed post-backup hooks");
        }
        let mut first_err = None;
        for hook in entries {
            let vars = backup_vars(&hook.vm, local_path, &hook.backup);
            if let Err(err) = runner.run(HookKind::PostBackup, &vars) {
                warn!(vm = %hook.vm, error = %err, "delayed post-backup hook failed");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
