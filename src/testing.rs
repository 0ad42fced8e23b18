use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use crate::clock::Clock;
use crate::cluster::{ClusterClient, Task};
use crate::error::{BackupError, ClusterError, HookError, Result};
use crate::hooks::{HookKind, HookRunner, HookVars};
use crate::notify::Notifier;
use crate::services::{Cadence, Services};

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|date| date.and_hms_opt(h, mi, 0))
        .expect("valid test timestamp")
}

pub fn task(state: &str, percent: i64) -> Task {
    Task {
        task_tag: "t-1".to_string(),
        state: state.to_string(),
        progress_percent: percent,
        ..Task::default()
    }
}

pub fn services(
    share: &Path,
    cluster: Arc<FakeCluster>,
    hooks: Arc<FakeHooks>,
    notifier: Arc<FakeNotifier>,
) -> Services {
    Services {
        cluster,
        hooks,
        notifier,
        clock: Arc::new(FixedClock(at(2024, 5, 10, 20, 0))),
        local_path: share.to_path_buf(),
        delay_post_backup: false,
        cadence: Cadence {
            task_poll: Duration::ZERO,
            dir_poll: Duration::from_millis(1),
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Reads `before` for the first `switch_after` calls and `after` from then on.
pub struct StepClock {
    before: NaiveDateTime,
    after: NaiveDateTime,
    switch_after: usize,
    calls: AtomicUsize,
}

impl StepClock {
    pub fn new(before: NaiveDateTime, after: NaiveDateTime, switch_after: usize) -> Self {
        Self {
            before,
            after,
            switch_after,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> NaiveDateTime {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.switch_after {
            self.before
        } else {
            self.after
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DirMode {
    Immediate,
    After(Duration),
    Looping,
}

#[derive(Default)]
struct ClusterState {
    scripts: HashMap<String, VecDeque<std::result::Result<Task, ClusterError>>>,
    polls: HashMap<String, usize>,
    exports: Vec<(String, String)>,
    imports: Vec<(String, String)>,
    dirs_at_export: Vec<usize>,
    uploads: Vec<(String, u64, Vec<u8>)>,
    running: usize,
    max_running: usize,
}

/// Scripted cluster. Exports and imports get tags `job-<n>` whose status
/// sequence is the export script (RUNNING then COMPLETE unless overridden).
#[derive(Default)]
pub struct FakeCluster {
    vms: Vec<(String, String, Vec<String>)>,
    export_script: Option<Vec<std::result::Result<Task, ClusterError>>>,
    failing_exports: Vec<String>,
    fail_list: bool,
    share: Option<(PathBuf, DirMode)>,
    state: Mutex<ClusterState>,
}

impl FakeCluster {
    pub fn with_vm(mut self, name: &str, uuid: &str, tags: &[&str]) -> Self {
        self.vms.push((
            name.to_string(),
            uuid.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    pub fn with_task_script(self, tag: &str, script: Vec<std::result::Result<Task, ClusterError>>) -> Self {
        self.lock().scripts.insert(tag.to_string(), script.into());
        self
    }

    pub fn with_export_script(mut self, script: Vec<std::result::Result<Task, ClusterError>>) -> Self {
        self.export_script = Some(script);
        self
    }

    /// Exports of this VM uuid are rejected by the cluster.
    pub fn failing_export(mut self, uuid: &str) -> Self {
        self.failing_exports.push(uuid.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Exports create their destination directory under `share`.
    pub fn creating_in(mut self, share: &Path) -> Self {
        self.share = Some((share.to_path_buf(), DirMode::Immediate));
        self
    }

    /// Exports create their directory under `share` only after `delay`.
    pub fn creating_late_in(mut self, share: &Path, delay: Duration) -> Self {
        self.share = Some((share.to_path_buf(), DirMode::After(delay)));
        self
    }

    /// Exports leave a self-referencing symlink where the directory belongs.
    pub fn looping_in(mut self, share: &Path) -> Self {
        self.share = Some((share.to_path_buf(), DirMode::Looping));
        self
    }

    /// For each export, how many earlier export directories existed when it started.
    pub fn dirs_at_export(&self) -> Vec<usize> {
        self.lock().dirs_at_export.clone()
    }

    pub fn uploads(&self) -> Vec<(String, u64, Vec<u8>)> {
        self.lock().uploads.clone()
    }

    pub fn polls(&self, tag: &str) -> usize {
        self.lock().polls.get(tag).copied().unwrap_or(0)
    }

    pub fn exports(&self) -> Vec<(String, String)> {
        self.lock().exports.clone()
    }

    pub fn imports(&self) -> Vec<(String, String)> {
        self.lock().imports.clone()
    }

    /// Most exports observed running at the same time.
    pub fn max_running(&self) -> usize {
        self.lock().max_running
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start_job(&self, state: &mut ClusterState) -> String {
        let tag = format!("job-{}", state.exports.len() + state.imports.len());
        let script = self
            .export_script
            .clone()
            .unwrap_or_else(|| vec![Ok(task("RUNNING", 50)), Ok(task("COMPLETE", 100))]);
        state.scripts.insert(tag.clone(), script.into());
        tag
    }
}

impl ClusterClient for FakeCluster {
    fn list_vms(&self, tag: Option<&str>) -> std::result::Result<BTreeMap<String, String>, ClusterError> {
        if self.fail_list {
            return Err(ClusterError::Http("connection refused".to_string()));
        }
        Ok(self
            .vms
            .iter()
            .filter(|(_, _, tags)| tag.map_or(true, |t| tags.iter().any(|x| x == t)))
            .map(|(name, uuid, _)| (name.clone(), uuid.clone()))
            .collect())
    }

    fn start_export(&self, vm_uuid: &str, folder: &str) -> std::result::Result<String, ClusterError> {
        if self.failing_exports.iter().any(|u| u == vm_uuid) {
            return Err(ClusterError::Status {
                status: 500,
                path: format!("/rest/v1/VirDomain/{}/export", vm_uuid),
            });
        }
        let mut state = self.lock();
        let tag = self.start_job(&mut state);
        if let Some((share, _)) = &self.share {
            let existing = state
                .exports
                .iter()
                .filter(|(_, earlier)| share.join(earlier).is_dir())
                .count();
            state.dirs_at_export.push(existing);
        }
        state.exports.push((vm_uuid.to_string(), folder.to_string()));
        state.running += 1;
        state.max_running = state.max_running.max(state.running);
        if let Some((share, mode)) = &self.share {
            let dir = share.join(folder);
            match *mode {
                DirMode::Immediate => {
                    fs::create_dir_all(&dir).map_err(|e| ClusterError::Http(e.to_string()))?;
                }
                DirMode::After(delay) => {
                    thread::spawn(move || {
                        thread::sleep(delay);
                        let _ = fs::create_dir_all(&dir);
                    });
                }
                DirMode::Looping => {
                    std::os::unix::fs::symlink(&dir, &dir).map_err(|e| ClusterError::Http(e.to_string()))?;
                }
            }
        }
        Ok(tag)
    }

    fn start_import(&self, new_vm_name: &str, folder: &str) -> std::result::Result<String, ClusterError> {
        let mut state = self.lock();
        let tag = self.start_job(&mut state);
        state.imports.push((new_vm_name.to_string(), folder.to_string()));
        state.running += 1;
        Ok(tag)
    }

    fn poll_task(&self, task_tag: &str) -> std::result::Result<Task, ClusterError> {
        let mut state = self.lock();
        *state.polls.entry(task_tag.to_string()).or_default() += 1;
        let next = state
            .scripts
            .get_mut(task_tag)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ClusterError::Http(format!("no status scripted for {}", task_tag))));
        if let Ok(task) = &next {
            if matches!(task.state.as_str(), "COMPLETE" | "ERROR") {
                state.running = state.running.saturating_sub(1);
            }
        }
        next
    }

    fn upload_disk(
        &self,
        filename: &str,
        size: u64,
        mut body: Box<dyn Read + Send>,
    ) -> std::result::Result<String, ClusterError> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)
            .map_err(|e| ClusterError::Http(e.to_string()))?;
        let mut state = self.lock();
        state.uploads.push((filename.to_string(), size, bytes));
        Ok(format!("disk-{}", state.uploads.len()))
    }
}

/// Records hook invocations as `(kind, VMName or NewVMName)`.
#[derive(Default)]
pub struct FakeHooks {
    failing: Vec<(HookKind, Option<String>)>,
    calls: Mutex<Vec<(HookKind, Option<String>)>>,
}

impl FakeHooks {
    pub fn failing_for_vm(mut self, kind: HookKind, vm: &str) -> Self {
        self.failing.push((kind, Some(vm.to_string())));
        self
    }

    /// Fails `kind` when it runs without a VM, as the schedule hooks do.
    pub fn failing(mut self, kind: HookKind) -> Self {
        self.failing.push((kind, None));
        self
    }

    pub fn calls(&self) -> Vec<(HookKind, Option<String>)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl HookRunner for FakeHooks {
    fn run(&self, kind: HookKind, vars: &HookVars) -> std::result::Result<(), HookError> {
        let vm = vars.get("VMName").or_else(|| vars.get("NewVMName")).cloned();
        let call = (kind, vm);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call.clone());
        if self.failing.contains(&call) {
            let reason = match &call.1 {
                Some(vm) => format!("vm {} hook script exited 1", vm),
                None => "hook script exited 1".to_string(),
            };
            return Err(HookError::Failed {
                hook: kind.label(),
                reason,
            });
        }
        Ok(())
    }
}

/// Records every notification; optionally reports delivery failure.
#[derive(Default)]
pub struct FakeNotifier {
    fail: bool,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|(subject, _)| subject).collect()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for FakeNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((subject.to_string(), body.to_string()));
        if self.fail {
            return Err(BackupError::Notify("smtp unreachable".to_string()));
        }
        Ok(())
    }
}
