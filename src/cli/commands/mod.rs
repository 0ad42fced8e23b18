pub mod backup;
pub mod interactive;
pub mod media;
pub mod schedule;
pub mod show;

use std::sync::Arc;

use crate::clock::SystemClock;
use crate::cluster::HyperCoreClient;
use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, Result};
use crate::hooks::CommandHookRunner;
use crate::notify::notifier_for;
use crate::services::{Cadence, Services};
use crate::types::RunMode;

pub fn build_services(config: &RuntimeConfig, run_mode: RunMode) -> Result<Services> {
    let cluster = HyperCoreClient::new(&config.cluster, &config.share)?;
    Ok(Services {
        cluster: Arc::new(cluster),
        hooks: Arc::new(CommandHookRunner::new(config.hooks.clone(), run_mode)),
        notifier: Arc::from(notifier_for(config.smtp.as_ref())),
        clock: Arc::new(SystemClock),
        local_path: config.local_path.clone(),
        delay_post_backup: config.hooks.delay_post_backup_when_scheduled,
        cadence: Cadence::default(),
    })
}

pub fn exit_code(err: &BackupError) -> i32 {
    match err {
        BackupError::Config(_) => 2,
        BackupError::Reported(inner) => exit_code(inner),
        _ => 1,
    }
}

pub fn exit_for_error(err: &BackupError) -> ! {
    eprintln!("{}", err);
    std::process::exit(exit_code(err));
}
