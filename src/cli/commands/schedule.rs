use crate::cli::commands::build_services;
use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, Result};
use crate::scheduler::run_scheduled;
use crate::types::RunMode;

pub fn run_schedule_command(config: &RuntimeConfig, run_mode: RunMode) -> Result<()> {
    let services = build_services(config, run_mode)?;
    println!("{}", services.clock.now().format("%d-%m-%Y %H:%M"));
    let report = run_scheduled(services, config.schedule.as_ref()).map_err(BackupError::reported)?;
    println!(
        "{} backed up, {} failed, {} expired backups deleted",
        report.completed.len(),
        report.failed.len(),
        report.deleted
    );
    Ok(())
}
