use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cluster::{ClusterClient, Task};
use crate::error::{ClusterError, TaskError};
use crate::types::TaskState;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
// A failed poll, UNINITIALIZED or an unrecognized state is a strike; only
// QUEUED or RUNNING clears them.
pub const MAX_CONSECUTIVE_STRIKES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Waiting,
    Percent(i64),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seen {
    Nothing,
    Waiting,
    Percent(i64),
}

enum Strike {
    PollFailed(ClusterError),
    Uninitialized(Task),
    Unknown(Task),
}

impl Strike {
    fn into_error(self, tag: &str) -> TaskError {
        match self {
            Strike::PollFailed(source) => TaskError::StatusUnknown {
                tag: tag.to_string(),
                source,
            },
            Strike::Uninitialized(task) => TaskError::NeverStarted {
                tag: tag.to_string(),
                detail: task.detail(),
            },
            Strike::Unknown(task) => TaskError::UnknownState {
                tag: tag.to_string(),
                detail: task.detail(),
            },
        }
    }
}

pub struct TaskTracker<'a> {
    cluster: &'a dyn ClusterClient,
    poll_interval: Duration,
}

impl<'a> TaskTracker<'a> {
    pub fn new(cluster: &'a dyn ClusterClient) -> Self {
        Self {
            cluster,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Blocks until the task reaches COMPLETE (returned) or ERROR, or until
    /// more than [`MAX_CONSECUTIVE_STRIKES`] bad observations in a row.
    pub fn track(&self, tag: &str, mut report: impl FnMut(&Progress)) -> Result<Task, TaskError> {
        let mut strikes: u32 = 0;
        let mut seen = Seen::Nothing;

        loop {
            let strike = match self.cluster.poll_task(tag) {
                Err(err) => {
                    warn!(task = tag, error = %err, "task status poll failed");
                    Some(Strike::PollFailed(err))
                }
                Ok(task) => {
                    let state = task.state();
                    debug!(task = tag, state = state.as_str(), percent = task.progress_percent, "task status");
                    match state {
                        TaskState::Complete => {
                            report(&Progress::Complete);
                            return Ok(task);
                        }
                        TaskState::Error => {
                            return Err(TaskError::Failed {
                                tag: tag.to_string(),
                                detail: task.detail(),
                            });
                        }
                        TaskState::Queued => {
                            strikes = 0;
                            if seen != Seen::Waiting {
                                seen = Seen::Waiting;
                                report(&Progress::Waiting);
                            }
                            None
                        }
                        TaskState::Running => {
                            strikes = 0;
                            if seen != Seen::Percent(task.progress_percent) {
                                seen = Seen::Percent(task.progress_percent);
                                report(&Progress::Percent(task.progress_percent));
                            }
                            None
                        }
                        TaskState::Uninitialized => Some(Strike::Uninitialized(task)),
                        TaskState::Unknown(ref value) => {
                            warn!(task = tag, state = %value, "unrecognized task state");
                            Some(Strike::Unknown(task))
                        }
                    }
                }
            };

            if let Some(strike) = strike {
                strikes += 1;
                if strikes > MAX_CONSECUTIVE_STRIKES {
                    return Err(strike.into_error(tag));
                }
            }
            thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{task, FakeCluster};

    fn run(script: Vec<Result<Task, ClusterError>>) -> (Result<Task, TaskError>, Vec<Progress>, usize) {
        let cluster = FakeCluster::default().with_task_script("t-1", script);
        let mut events = Vec::new();
        let result = TaskTracker::new(&cluster)
            .with_poll_interval(Duration::ZERO)
            .track("t-1", |p| events.push(p.clone()));
        (result, events, cluster.polls("t-1"))
    }

    #[test]
    fn progress_printed_only_on_change() {
        let (result, events, _) = run(vec![
            Ok(task("QUEUED", 0)),
            Ok(task("RUNNING", 10)),
            Ok(task("RUNNING", 10)),
            Ok(task("RUNNING", 55)),
            Ok(task("COMPLETE", 100)),
        ]);
        assert!(result.is_ok());
        assert_eq!(
            events,
            vec![
                Progress::Waiting,
                Progress::Percent(10),
                Progress::Percent(55),
                Progress::Complete
            ]
        );
    }

    #[test]
    fn waiting_reported_again_after_running() {
        let (_, events, _) = run(vec![
            Ok(task("QUEUED", 0)),
            Ok(task("QUEUED", 0)),
            Ok(task("RUNNING", 0)),
            Ok(task("QUEUED", 0)),
            Ok(task("COMPLETE", 100)),
        ]);
        assert_eq!(
            events,
            vec![
                Progress::Waiting,
                Progress::Percent(0),
                Progress::Waiting,
                Progress::Complete
            ]
        );
    }

    #[test]
    fn six_uninitialized_polls_abort() {
        let (result, _, polls) = run(vec![Ok(task("UNINITIALIZED", 0)); 6]);
        assert!(matches!(result, Err(TaskError::NeverStarted { .. })));
        assert_eq!(polls, 6);
    }

    #[test]
    fn five_uninitialized_polls_are_tolerated() {
        let mut script = vec![Ok(task("UNINITIALIZED", 0)); 5];
        script.push(Ok(task("COMPLETE", 100)));
        let (result, _, _) = run(script);
        assert!(result.is_ok());
    }

    #[test]
    fn repeated_poll_failures_report_unknown_status() {
        let script = (0..6)
            .map(|_| Err(ClusterError::Http("connection refused".to_string())))
            .collect();
        let (result, events, _) = run(script);
        let err = result.unwrap_err();
        assert!(matches!(err, TaskError::StatusUnknown { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert!(events.is_empty());
    }

    #[test]
    fn running_resets_the_strike_count() {
        let mut script: Vec<Result<Task, ClusterError>> = vec![Ok(task("UNINITIALIZED", 0)); 5];
        script.push(Ok(task("RUNNING", 5)));
        script.extend(vec![Ok(task("UNINITIALIZED", 0)); 5]);
        script.push(Ok(task("COMPLETE", 100)));
        let (result, _, polls) = run(script);
        assert!(result.is_ok());
        assert_eq!(polls, 12);
    }

    #[test]
    fn mixed_failures_and_unknown_states_accumulate() {
        let script = vec![
            Err(ClusterError::Http("timeout".to_string())),
            Ok(task("UNINITIALIZED", 0)),
            Ok(task("PAUSED", 0)),
            Err(ClusterError::Http("timeout".to_string())),
            Ok(task("UNINITIALIZED", 0)),
            Ok(task("PAUSED", 0)),
        ];
        let (result, _, _) = run(script);
        assert!(matches!(result, Err(TaskError::UnknownState { .. })));
    }

    #[test]
    fn error_state_fails_immediately() {
        let (result, _, polls) = run(vec![
            Ok(task("RUNNING", 20)),
            Ok(task("ERROR", 20)),
            Ok(task("COMPLETE", 100)),
        ]);
        let err = result.unwrap_err();
        assert!(matches!(err, TaskError::Failed { .. }));
        assert!(err.to_string().contains("\"state\": \"ERROR\""));
        assert_eq!(polls, 2);
    }
}
