use std::path::Path;

use crate::backup::info::{backup_size, describe_age, human_size};
use crate::catalog::{backup_path, Catalog};
use crate::cli::commands::build_services;
use crate::cluster::ClusterClient;
use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, Result};
use crate::queue::{build_queue, BackupAge, QueueEntry};
use crate::types::{BackupName, RunMode};

pub(crate) const LISTING_TIME_FORMAT: &str = "%Y-%m-%d %I:%M %p";

pub fn run_show_vms(config: &RuntimeConfig, run_mode: RunMode) -> Result<()> {
    let services = build_services(config, run_mode)?;
    for line in vm_lines(services.cluster.as_ref())? {
        println!("{}", line);
    }
    Ok(())
}

pub fn run_show_backups(config: &RuntimeConfig) -> Result<()> {
    let catalog = Catalog::scan(&config.local_path)?;
    for line in backup_lines(&config.local_path, &catalog) {
        println!("{}", line);
    }
    Ok(())
}

pub fn run_show_queue(config: &RuntimeConfig, run_mode: RunMode) -> Result<()> {
    let Some(schedule) = config.schedule.as_ref() else {
        return Err(BackupError::message("No schedule configured"));
    };
    let services = build_services(config, run_mode)?;
    let queue = build_queue(
        services.cluster.as_ref(),
        &config.local_path,
        &schedule.tag,
        schedule.backup_interval,
        services.clock.now(),
    )?;
    for line in queue_lines(&queue) {
        println!("{}", line);
    }
    Ok(())
}

pub fn vm_lines(cluster: &dyn ClusterClient) -> Result<Vec<String>> {
    Ok(cluster.list_vms(None)?.into_keys().collect())
}

/// One header line per VM followed by its backups, newest first.
pub fn backup_lines(root: &Path, catalog: &Catalog) -> Vec<String> {
    let mut lines = Vec::new();
    for (vm, times) in catalog.iter() {
        lines.push(vm.to_string());
        for created in times {
            let name = BackupName::new(*created, vm);
            let size = match backup_size(&backup_path(root, &name)) {
                Ok(size) => size,
                Err(err) => {
                    eprintln!("Error getting size of {}: {}", name, err);
                    0
                }
            };
            lines.push(format!("\t{} ({})", created.format(LISTING_TIME_FORMAT), human_size(size)));
        }
    }
    lines
}

pub fn queue_lines(queue: &[QueueEntry]) -> Vec<String> {
    queue
        .iter()
        .map(|entry| match entry.age {
            BackupAge::Never => format!("{} (no backups)", entry.vm),
            age => format!("{} ({} old)", entry.vm, describe_age(age)),
        })
        .collect()
}
