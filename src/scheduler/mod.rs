use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::backup::retention::cleanup;
use crate::backup::{backup_visible, report_backup_failure, run_backup};
use crate::config::model::Schedule;
use crate::error::{BackupError, HookError, Result};
use crate::hooks::{schedule_vars, DeferredHooks, HookKind, HookRunner};
use crate::notify::{notify, report_failure};
use crate::queue::{build_queue, names};
use crate::services::Services;
use crate::types::BackupName;

pub mod permits;

pub use permits::{Permit, PermitPool};

const WINDOW_FORMAT: &str = "%H:%M";

/// State shared by the backup jobs of one scheduled run.
#[derive(Debug, Default)]
pub struct RunContext {
    deferred: Mutex<DeferredHooks>,
    dispatched: Mutex<BTreeSet<String>>,
}

impl RunContext {
    pub fn defer_post_backup(&self, vm: &str, backup: &str) {
        lock(&self.deferred).push(vm, backup);
    }

    pub fn deferred_len(&self) -> usize {
        lock(&self.deferred).len()
    }

    /// Records `vm` as started in this run. False if it already was.
    fn claim(&self, vm: &str) -> bool {
        lock(&self.dispatched).insert(vm.to_string())
    }

    fn was_dispatched(&self, vm: &str) -> bool {
        lock(&self.dispatched).contains(vm)
    }

    fn flush_deferred(&self, runner: &dyn HookRunner, local_path: &Path) -> std::result::Result<(), HookError> {
        lock(&self.deferred).flush(runner, local_path)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub behind: Vec<String>,
    pub deleted: usize,
}

type Worker = (String, JoinHandle<bool>);

pub struct Scheduler {
    services: Services,
    schedule: Schedule,
}

pub fn run_scheduled(services: Services, schedule: Option<&Schedule>) -> Result<RunReport> {
    let Some(schedule) = schedule else {
        let body = "No backups started because the schedule is not configured";
        report_failure(services.notifier.as_ref(), "Backup not started", body);
        return Err(BackupError::message(body));
    };
    Scheduler::new(services, schedule.clone()).run()
}

impl Scheduler {
    pub fn new(services: Services, schedule: Schedule) -> Self {
        Self { services, schedule }
    }

    /// Backs up due VMs while the window is open, then reports stragglers,
    /// enforces retention and runs the end-of-run hooks.
    pub fn run(&self) -> Result<RunReport> {
        let services = &self.services;
        let schedule = &self.schedule;

        let now = services.clock.now();
        if !schedule.window.is_active_at(now.time()) {
            let body = format!(
                "No backups started because the backup window ({}-{}) is not active",
                schedule.start().format(WINDOW_FORMAT),
                schedule.end().format(WINDOW_FORMAT)
            );
            report_failure(services.notifier.as_ref(), "Backup not started", &body);
            return Err(BackupError::message(body));
        }
        info!(tag = %schedule.tag, concurrency = schedule.concurrency, "scheduled run starting");

        let vars = schedule_vars(&services.local_path);
        if let Err(err) = services.hooks.run(HookKind::PreSchedule, &vars) {
            report_failure(
                services.notifier.as_ref(),
                "Pre-schedule hook failed",
                &format!("Pre-schedule hook failed: {}", err),
            );
        }

        let pool = PermitPool::new(schedule.concurrency);
        let run = Arc::new(RunContext::default());
        let mut workers = Vec::new();
        let dispatched = self.dispatch(&pool, &run, &mut workers);

        pool.drain();
        let mut report = RunReport::default();
        for (vm, handle) in workers {
            match handle.join() {
                Ok(true) => report.completed.push(vm),
                _ => report.failed.push(vm),
            }
        }
        if let Err(err) = dispatched {
            self.finish(&run, false);
            return Err(err);
        }

        report.behind = self.behind_schedule();

        match cleanup(&services.local_path, schedule.retention, services.clock.now()) {
            Ok(deleted) => report.deleted = deleted,
            Err(err) => {
                report_failure(
                    services.notifier.as_ref(),
                    "Failed to cleanup old backups",
                    &format!("Error while trying to cleanup old backups: {}", err),
                );
                self.finish(&run, false);
                return Err(err);
            }
        }

        self.finish(&run, true);
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            deleted = report.deleted,
            "scheduled run finished"
        );
        Ok(report)
    }

    fn dispatch(&self, pool: &Arc<PermitPool>, run: &Arc<RunContext>, workers: &mut Vec<Worker>) -> Result<()> {
        let services = &self.services;
        let schedule = &self.schedule;
        loop {
            let permit = pool.acquire();

            let now = services.clock.now();
            if !schedule.window.is_active_at(now.time()) {
                println!("Backup window closed. Waiting for currently running backups to complete...");
                info!("backup window closed");
                return Ok(());
            }

            let queue = build_queue(
                services.cluster.as_ref(),
                &services.local_path,
                &schedule.tag,
                schedule.backup_interval,
                now,
            )
            .map_err(|err| {
                let body = format!(
                    "Some (maybe all) backups skipped because the backup queue could not be retrieved: {}",
                    err
                );
                report_failure(services.notifier.as_ref(), "Backup not started", &body);
                BackupError::message(body)
            })?;

            let Some(next) = queue.into_iter().find(|entry| !run.was_dispatched(&entry.vm)) else {
                println!("No more backups in queue");
                return Ok(());
            };
            let vm = next.vm;
            run.claim(&vm);
            let backup = BackupName::new(services.clock.now(), &vm);
            debug!(vm = %vm, backup = %backup, "dispatching backup");

            let done = Arc::new(AtomicBool::new(false));
            let handle = {
                let services = services.clone();
                let run = Arc::clone(run);
                let done = Arc::clone(&done);
                let vm = vm.clone();
                let backup = backup.clone();
                thread::Builder::new()
                    .name(format!("backup-{}", vm))
                    .spawn(move || {
                        let _permit = permit;
                        let result = run_backup(&services, &vm, &backup.to_string(), Some(&run));
                        if let Err(err) = &result {
                            report_backup_failure(&services, &vm, err);
                        }
                        done.store(true, Ordering::SeqCst);
                        result.is_ok()
                    })?
            };
            workers.push((vm.clone(), handle));

            self.await_backup_dir(&vm, &backup, &done).map_err(|err| {
                let body = format!("Error while waiting for local file during backup of {}: {}", vm, err);
                report_failure(services.notifier.as_ref(), "Backup failed", &body);
                BackupError::message(body)
            })?;
        }
    }

    /// Waits until the export directory shows up on the share so the next
    /// queue rebuild sees this VM as fresh. Gives up once the job has ended.
    fn await_backup_dir(&self, vm: &str, backup: &BackupName, done: &AtomicBool) -> std::io::Result<()> {
        loop {
            if backup_visible(&self.services, backup)? {
                return Ok(());
            }
            if done.load(Ordering::SeqCst) {
                if !backup_visible(&self.services, backup)? {
                    debug!(vm, "backup ended without creating its directory");
                }
                return Ok(());
            }
            thread::sleep(self.services.cadence.dir_poll);
        }
    }

    fn behind_schedule(&self) -> Vec<String> {
        let services = &self.services;
        let schedule = &self.schedule;
        let queue = match build_queue(
            services.cluster.as_ref(),
            &services.local_path,
            &schedule.tag,
            schedule.backup_interval + schedule.tolerance,
            services.clock.now(),
        ) {
            Ok(queue) => queue,
            Err(err) => {
                eprintln!("Error checking backup queue: {}", err);
                warn!(error = %err, "behind-schedule check failed");
                return Vec::new();
            }
        };
        let behind = names(&queue);
        if !behind.is_empty() {
            let mut body = String::from("Backups are behind schedule.\nThe following VMs are still in the queue:\n\n");
            for vm in &behind {
                body.push_str(vm);
                body.push('\n');
            }
            eprintln!("{}", body);
            notify(services.notifier.as_ref(), "Backups are behind schedule", &body);
        }
        behind
    }

    /// Flushes deferred post-backup hooks, then the post-schedule hook when
    /// the run completed. Reports the first hook failure.
    fn finish(&self, run: &RunContext, completed: bool) {
        let services = &self.services;
        let mut first_err = run.flush_deferred(services.hooks.as_ref(), &services.local_path).err();
        if completed {
            let vars = schedule_vars(&services.local_path);
            if let Err(err) = services.hooks.run(HookKind::PostSchedule, &vars) {
                first_err.get_or_insert(err);
            }
        }
        if let Some(err) = first_err {
            report_failure(
                services.notifier.as_ref(),
                "Post-schedule hook failed",
                &format!("Post-schedule hook failed: {}", err),
            );
        }
    }
}
