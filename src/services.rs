use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::cluster::ClusterClient;
use crate::hooks::HookRunner;
use crate::notify::Notifier;

/// Polling cadences. Tests shrink these.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub task_poll: Duration,
    pub dir_poll: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            task_poll: crate::task::POLL_INTERVAL,
            dir_poll: Duration::from_secs(1),
        }
    }
}

/// Collaborators shared by backup jobs and the scheduler.
#[derive(Clone)]
pub struct Services {
    pub cluster: Arc<dyn ClusterClient>,
    pub hooks: Arc<dyn HookRunner>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub local_path: PathBuf,
    pub delay_post_backup: bool,
    pub cadence: Cadence,
}
