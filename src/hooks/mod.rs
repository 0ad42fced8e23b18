use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::config::model::HooksConfig;
use crate::error::HookError;
use crate::types::RunMode;
use crate::util::command::run_command;

pub mod deferred;

pub use deferred::{DeferredHooks, DelayedHook};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    PreBackup,
    PostBackup,
    PreRestore,
    PostRestore,
    PreSchedule,
    PostSchedule,
}

impl HookKind {
    pub fn label(&self) -> &'static str {
        match self {
            HookKind::PreBackup => "pre-backup",
            HookKind::PostBackup => "post-backup",
            HookKind::PreRestore => "pre-restore",
            HookKind::PostRestore => "post-restore",
            HookKind::PreSchedule => "pre-schedule",
            HookKind::PostSchedule => "post-schedule",
        }
    }
}

/// Named values substituted for `{{Name}}` in hook arguments.
pub type HookVars = BTreeMap<&'static str, String>;

pub fn backup_vars(vm: &str, local_path: &Path, backup_name: &str) -> HookVars {
    HookVars::from([
        ("VMName", vm.to_string()),
        ("LocalPath", local_path.display().to_string()),
        ("BackupName", backup_name.to_string()),
    ])
}

pub fn restore_vars(new_vm: &str, local_path: &Path, backup_name: &str) -> HookVars {
    HookVars::from([
        ("NewVMName", new_vm.to_string()),
        ("LocalPath", local_path.display().to_string()),
        ("BackupName", backup_name.to_string()),
    ])
}

pub fn schedule_vars(local_path: &Path) -> HookVars {
    HookVars::from([("LocalPath", local_path.display().to_string())])
}

pub trait HookRunner: Send + Sync {
    /// Runs the hook configured for `kind`. An unconfigured hook succeeds.
    fn run(&self, kind: HookKind, vars: &HookVars) -> Result<(), HookError>;
}

/// Splits a hook template on whitespace and substitutes variables in the
/// arguments. The program itself is taken verbatim.
pub fn parse_hook(template: &str, vars: &HookVars) -> Option<(String, Vec<String>)> {
    let mut parts = template.split_whitespace();
    let program = parts.next()?.to_string();
    let args = parts
        .map(|arg| {
            vars.iter().fold(arg.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{{{key}}}}}"), value)
            })
        })
        .collect();
    Some((program, args))
}

/// Runs hooks as external processes sharing this process's stdout/stderr.
pub struct CommandHookRunner {
    hooks: HooksConfig,
    run_mode: RunMode,
}

impl CommandHookRunner {
    pub fn new(hooks: HooksConfig, run_mode: RunMode) -> Self {
        Self { hooks, run_mode }
    }

    fn template(&self, kind: HookKind) -> Option<&str> {
        let value = match kind {
            HookKind::PreBackup => &self.hooks.pre_backup,
            HookKind::PostBackup => &self.hooks.post_backup,
            HookKind::PreRestore => &self.hooks.pre_restore,
            HookKind::PostRestore => &self.hooks.post_restore,
            HookKind::PreSchedule => &self.hooks.pre_schedule,
            HookKind::PostSchedule => &self.hooks.post_schedule,
        };
        value.as_deref().filter(|t| !t.trim().is_empty())
    }
}

impl HookRunner for CommandHookRunner {
    fn run(&self, kind: HookKind, vars: &HookVars) -> Result<(), HookError> {
        let Some(template) = self.template(kind) else {
            return Ok(());
        };
        let (program, args) =
            parse_hook(template, vars).ok_or(HookError::Empty { hook: kind.label() })?;
        info!(hook = kind.label(), %program, "running hook");
        let mut cmd = Command::new(&program);
        cmd.args(&args);
        let code = run_command(&mut cmd, self.run_mode).map_err(|e| HookError::Failed {
            hook: kind.label(),
            reason: e.to_string(),
        })?;
        if code != 0 {
            return Err(HookError::Failed {
                hook: kind.label(),
                reason: format!("exit status {code}"),
            });
        }
        Ok(())
    }
}
