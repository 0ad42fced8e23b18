use std::cmp::Ordering;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::catalog::Catalog;
use crate::cluster::ClusterClient;
use crate::error::Result;

/// Time since a VM's newest backup. `Never` sorts above every finite age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackupAge {
    Since(Duration),
    Never,
}

impl BackupAge {
    pub fn of(latest: Option<NaiveDateTime>, now: NaiveDateTime) -> Self {
        match latest {
            // A backup stamped in the future counts as brand new.
            Some(at) => BackupAge::Since((now - at).to_std().unwrap_or(Duration::ZERO)),
            None => BackupAge::Never,
        }
    }

    pub fn exceeds(&self, interval: Duration) -> bool {
        match self {
            BackupAge::Since(age) => *age > interval,
            BackupAge::Never => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub vm: String,
    pub age: BackupAge,
}

/// VMs whose age exceeds `interval`, oldest first, ties broken by name.
pub fn rank<'a>(
    vms: impl IntoIterator<Item = &'a str>,
    catalog: &Catalog,
    interval: Duration,
    now: NaiveDateTime,
) -> Vec<QueueEntry> {
    let mut due: Vec<QueueEntry> = vms
        .into_iter()
        .map(|vm| QueueEntry {
            vm: vm.to_string(),
            age: BackupAge::of(catalog.latest(vm), now),
        })
        .filter(|entry| entry.age.exceeds(interval))
        .collect();
    due.sort_by(|a, b| match b.age.cmp(&a.age) {
        Ordering::Equal => a.vm.cmp(&b.vm),
        other => other,
    });
    due
}

/// Fetches tagged VMs and the share catalog, then ranks them.
pub fn build_queue(
    cluster: &dyn ClusterClient,
    share_root: &Path,
    tag: &str,
    interval: Duration,
    now: NaiveDateTime,
) -> Result<Vec<QueueEntry>> {
    let vms = cluster.list_vms(Some(tag))?;
    let catalog = Catalog::scan(share_root)?;
    Ok(rank(vms.keys().map(String::as_str), &catalog, interval, now))
}

pub fn names(queue: &[QueueEntry]) -> Vec<String> {
    queue.iter().map(|entry| entry.vm.clone()).collect()
}
