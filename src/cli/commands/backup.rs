use tracing::error;

use crate::backup::{report_backup_failure, run_backup, run_restore};
use crate::cli::args::{BackupArgs, RestoreArgs};
use crate::cli::commands::build_services;
use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, Result};
use crate::types::RunMode;

pub fn run_backup_command(config: &RuntimeConfig, args: &BackupArgs, run_mode: RunMode) -> Result<()> {
    let services = build_services(config, run_mode)?;
    run_backup(&services, &args.vm, &args.backup_name, None).map_err(|err| {
        report_backup_failure(&services, &args.vm, &err);
        BackupError::reported(err)
    })
}

pub fn run_restore_command(config: &RuntimeConfig, args: &RestoreArgs, run_mode: RunMode) -> Result<()> {
    let services = build_services(config, run_mode)?;
    run_restore(&services, &args.backup_name, &args.new_vm_name).map_err(|err| {
        error!(backup = %args.backup_name, vm = %args.new_vm_name, error = %err, "restore failed");
        err
    })
}
