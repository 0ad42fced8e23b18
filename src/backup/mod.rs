use std::fs;

use tracing::{info, warn};

use crate::catalog::backup_path;
use crate::error::{BackupError, Result, TaskError};
use crate::hooks::{backup_vars, restore_vars, HookKind};
use crate::notify::report_failure;
use crate::scheduler::RunContext;
use crate::services::Services;
use crate::task::{Progress, TaskTracker};
use crate::types::{BackupName, VmName};
use crate::util::paths::share_folder;

pub mod info;
pub mod retention;

pub fn run_backup(services: &Services, vm: &str, backup_name: &str, run: Option<&RunContext>) -> Result<()> {
    share_folder(&services.local_path, backup_name)?;
    let vars = backup_vars(vm, &services.local_path, backup_name);
    if let Err(err) = services.hooks.run(HookKind::PreBackup, &vars) {
        report_failure(
            services.notifier.as_ref(),
            "Pre-backup hook failed",
            &format!("Pre-backup hook failed for {}: {}", vm, err),
        );
    }

    let vms = services.cluster.list_vms(None).map_err(|e| {
        BackupError::message(format!(
            "Backup of {} failed to start because the list of VMs could not be retrieved: {}",
            vm, e
        ))
    })?;
    let uuid = vms
        .get(vm)
        .ok_or_else(|| BackupError::message(format!("Backup of {} failed to start: VM not found", vm)))?;

    let tag = services
        .cluster
        .start_export(uuid, backup_name)
        .map_err(|e| BackupError::message(format!("Backup of {} failed to start: {}", vm, e)))?;
    if tag.is_empty() {
        return Err(BackupError::message(format!(
            "Backup of {} failed to start: no task tag returned",
            vm
        )));
    }
    println!("Backup of {} started as task {}", vm, tag);
    info!(vm, task = %tag, backup = backup_name, "backup started");

    TaskTracker::new(services.cluster.as_ref())
        .with_poll_interval(services.cadence.task_poll)
        .track(&tag, |progress| match progress {
            Progress::Waiting => println!("Waiting for other tasks on the cluster to complete..."),
            Progress::Percent(pct) => println!("{}: {}% complete", vm, pct),
            Progress::Complete => println!("Backup of {} completed", vm),
        })?;
    info!(vm, task = %tag, "backup completed");

    match run {
        Some(run) if services.delay_post_backup => run.defer_post_backup(vm, backup_name),
        _ => {
            if let Err(err) = services.hooks.run(HookKind::PostBackup, &vars) {
                report_failure(
                    services.notifier.as_ref(),
                    "Post-backup hook failed",
                    &format!("Post-backup hook failed for {}: {}", vm, err),
                );
            }
        }
    }
    Ok(())
}

pub fn failure_subject(err: &BackupError) -> &'static str {
    match err {
        BackupError::Task(TaskError::StatusUnknown { .. }) => "Backup status unknown",
        BackupError::Task(TaskError::NeverStarted { .. } | TaskError::UnknownState { .. }) => {
            "Backup failed to start"
        }
        _ => "Backup failed",
    }
}

pub fn report_backup_failure(services: &Services, vm: &str, err: &BackupError) {
    warn!(vm, error = %err, "backup failed");
    let body = match err {
        BackupError::Task(_) => format!("Backup of {} failed: {}", vm, err),
        _ => err.to_string(),
    };
    report_failure(services.notifier.as_ref(), failure_subject(err), &body);
}

pub fn run_restore(services: &Services, backup: &str, new_vm: &VmName) -> Result<()> {
    let folder = share_folder(&services.local_path, backup)?;
    let vars = restore_vars(new_vm.as_str(), &services.local_path, backup);
    services.hooks.run(HookKind::PreRestore, &vars)?;

    let meta = fs::metadata(&folder)
        .map_err(|e| BackupError::message(format!("Backup {} does not exist: {}", backup, e)))?;
    if !meta.is_dir() {
        return Err(BackupError::message(format!("{} is not a directory", folder.display())));
    }
    let existing = services.cluster.list_vms(None)?;
    if existing.contains_key(new_vm.as_str()) {
        return Err(BackupError::message(format!("VM {} already exists", new_vm)));
    }

    let tag = services
        .cluster
        .start_import(new_vm.as_str(), backup)
        .map_err(|e| BackupError::message(format!("Failed to start restore: {}", e)))?;
    if tag.is_empty() {
        return Err(BackupError::message("Failed to start restore: no task tag returned"));
    }
    println!("Restore started as task {}", tag);
    info!(vm = %new_vm, task = %tag, backup, "restore started");

    TaskTracker::new(services.cluster.as_ref())
        .with_poll_interval(services.cadence.task_poll)
        .track(&tag, |progress| match progress {
            Progress::Waiting => println!("Waiting for other tasks on the cluster to complete..."),
            Progress::Percent(pct) => println!("{}% complete", pct),
            Progress::Complete => println!("Restore of {} completed", new_vm),
        })?;

    if let Err(err) = services.hooks.run(HookKind::PostRestore, &vars) {
        eprintln!("Post-restore hook failed: {}", err);
        warn!(vm = %new_vm, error = %err, "post-restore hook failed");
    }
    Ok(())
}

pub fn backup_visible(services: &Services, backup: &BackupName) -> std::io::Result<bool> {
    match fs::metadata(backup_path(&services.local_path, backup)) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, services, task, FakeCluster, FakeHooks, FakeNotifier};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn name(vm: &str) -> String {
        BackupName::new(at(2024, 5, 10, 20, 0), vm).to_string()
    }

    #[test]
    fn backup_exports_tracks_and_runs_post_hook() {
        let share = TempDir::new().expect("tempdir");
        let cluster = Arc::new(FakeCluster::default().with_vm("web01", "uuid-web", &[]).creating_in(share.path()));
        let hooks = Arc::new(FakeHooks::default());
        let notifier = Arc::new(FakeNotifier::default());
        let svc = services(share.path(), cluster.clone(), hooks.clone(), notifier.clone());

        run_backup(&svc, "web01", &name("web01"), None).expect("backup");
        assert_eq!(cluster.exports(), vec![("uuid-web".to_string(), name("web01"))]);
        assert_eq!(
            hooks.calls(),
            vec![
                (HookKind::PreBackup, Some("web01".to_string())),
                (HookKind::PostBackup, Some("web01".to_string())),
            ]
        );
        assert!(notifier.subjects().is_empty());
    }

    #[test]
    fn unknown_vm_fails_to_start() {
        let share = TempDir::new().expect("tempdir");
        let cluster = Arc::new(FakeCluster::default());
        let svc = services(
            share.path(),
            cluster.clone(),
            Arc::new(FakeHooks::default()),
            Arc::new(FakeNotifier::default()),
        );
        let err = run_backup(&svc, "ghost", &name("ghost"), None).unwrap_err();
        assert!(err.to_string().contains("VM not found"));
        assert!(cluster.exports().is_empty());
    }

    #[test]
    fn pre_backup_hook_failure_is_reported_not_fatal() {
        let share = TempDir::new().expect("tempdir");
        let cluster = Arc::new(FakeCluster::default().with_vm("web01", "uuid-web", &[]));
        let hooks = Arc::new(FakeHooks::default().failing_for_vm(HookKind::PreBackup, "web01"));
        let notifier = Arc::new(FakeNotifier::default());
        let svc = services(share.path(), cluster, hooks, notifier.clone());

        run_backup(&svc, "web01", &name("web01"), None).expect("backup");
        assert_eq!(notifier.subjects(), vec!["Pre-backup hook failed".to_string()]);
    }

    #[test]
    fn scheduled_backup_defers_post_hook_when_configured() {
        let share = TempDir::new().expect("tempdir");
        let cluster = Arc::new(FakeCluster::default().with_vm("web01", "uuid-web", &[]));
        let hooks = Arc::new(FakeHooks::default());
        let mut svc = services(share.path(), cluster, hooks.clone(), Arc::new(FakeNotifier::default()));
        svc.delay_post_backup = true;
        let run = RunContext::default();

        run_backup(&svc, "web01", &name("web01"), Some(&run)).expect("backup");
        assert_eq!(hooks.calls(), vec![(HookKind::PreBackup, Some("web01".to_string()))]);
        assert_eq!(run.deferred_len(), 1);

        run_backup(&svc, "web01", &name("web01"), None).expect("manual backup");
        assert_eq!(hooks.calls().len(), 3);
    }

    #[test]
    fn task_error_maps_to_failure_subject() {
        let share = TempDir::new().expect("tempdir");
        let cluster = Arc::new(
            FakeCluster::default()
                .with_vm("web01", "uuid-web", &[])
                .with_export_script(vec![Ok(task("RUNNING", 10)), Ok(task("ERROR", 10))]),
        );
        let hooks = Arc::new(FakeHooks::default());
        let svc = services(share.path(), cluster, hooks.clone(), Arc::new(FakeNotifier::default()));

        let err = run_backup(&svc, "web01", &name("web01"), None).unwrap_err();
        assert_eq!(failure_subject(&err), "Backup failed");
        assert_eq!(hooks.calls().len(), 1);
    }

    #[test]
    fn restore_requires_backup_directory() {
        let share = TempDir::new().expect("tempdir");
        let cluster = Arc::new(FakeCluster::default());
        let svc = services(
            share.path(),
            cluster.clone(),
            Arc::new(FakeHooks::default()),
            Arc::new(FakeNotifier::default()),
        );
        let new_vm: VmName = "web01-restored".parse().expect("name");
        let err = run_restore(&svc, "2024-05-10_20-00-00 web01", &new_vm).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(cluster.imports().is_empty());
    }

    #[test]
    fn restore_imports_and_runs_hooks() {
        let share = TempDir::new().expect("tempdir");
        let backup = name("web01");
        fs::create_dir(share.path().join(&backup)).expect("mkdir");
        let cluster = Arc::new(FakeCluster::default());
        let hooks = Arc::new(FakeHooks::default());
        let svc = services(share.path(), cluster.clone(), hooks.clone(), Arc::new(FakeNotifier::default()));
        let new_vm: VmName = "web01-restored".parse().expect("name");

        run_restore(&svc, &backup, &new_vm).expect("restore");
        assert_eq!(cluster.imports(), vec![("web01-restored".to_string(), backup)]);
        assert_eq!(
            hooks.calls(),
            vec![
                (HookKind::PreRestore, Some("web01-restored".to_string())),
                (HookKind::PostRestore, Some("web01-restored".to_string())),
            ]
        );
    }

    #[test]
    fn restore_refuses_existing_vm_name() {
        let share = TempDir::new().expect("tempdir");
        let backup = name("web01");
        fs::create_dir(share.path().join(&backup)).expect("mkdir");
        let cluster = Arc::new(FakeCluster::default().with_vm("web01", "uuid-web", &[]));
        let svc = services(
            share.path(),
            cluster.clone(),
            Arc::new(FakeHooks::default()),
            Arc::new(FakeNotifier::default()),
        );
        let new_vm: VmName = "web01".parse().expect("name");

        let err = run_restore(&svc, &backup, &new_vm).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(cluster.imports().is_empty());
    }

    #[test]
    fn failed_pre_restore_hook_aborts() {
        let share = TempDir::new().expect("tempdir");
        let backup = name("web01");
        fs::create_dir(share.path().join(&backup)).expect("mkdir");
        let cluster = Arc::new(FakeCluster::default());
        let hooks = Arc::new(FakeHooks::default().failing_for_vm(HookKind::PreRestore, "copy"));
        let svc = services(share.path(), cluster.clone(), hooks, Arc::new(FakeNotifier::default()));
        let new_vm: VmName = "copy".parse().expect("name");

        assert!(run_restore(&svc, &backup, &new_vm).is_err());
        assert!(cluster.imports().is_empty());
    }
}
