use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Cluster(ClusterError),
    #[error("{0}")]
    Task(TaskError),
    #[error("{0}")]
    Retention(RetentionError),
    #[error("{0}")]
    Hook(HookError),
    #[error("email failed: {0}")]
    Notify(String),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Reported(Box<BackupError>),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found")]
    NotFound,
    #[error("parse config: {0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Error)]
pub enum ClusterError {
    #[error("cluster request {0}")]
    Http(String),
    #[error("cluster returned status {status} for {path}")]
    Status { status: u16, path: String },
    #[error("decode cluster response: {0}")]
    Decode(String),
    #[error("expected 1 task, got {0}")]
    TaskCount(usize),
}

/// Why a tracked remote task did not reach COMPLETE.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {tag} failed\n{detail}")]
    Failed { tag: String, detail: String },
    #[error("cannot retrieve status of task {tag}: {source}")]
    StatusUnknown {
        tag: String,
        #[source]
        source: ClusterError,
    },
    #[error("task {tag} failed to start\n{detail}")]
    NeverStarted { tag: String, detail: String },
    #[error("unknown state for task {tag}\n{detail}")]
    UnknownState { tag: String, detail: String },
}

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("refusing to delete {percent:.0}% of backups ({marked} of {total})")]
    SafetyValve {
        percent: f64,
        marked: usize,
        total: usize,
    },
    #[error("delete {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{hook} hook failed: {reason}")]
    Failed { hook: &'static str, reason: String },
    #[error("{hook} hook is empty")]
    Empty { hook: &'static str },
}

pub type Result<T> = std::result::Result<T, BackupError>;

impl BackupError {
    pub fn message(msg: impl Into<String>) -> Self {
        BackupError::Message(msg.into())
    }

    /// Marks an error whose details already went to stderr and email.
    pub fn reported(err: BackupError) -> Self {
        match err {
            BackupError::Reported(_) => err,
            other => BackupError::Reported(Box::new(other)),
        }
    }
}

impl From<ConfigError> for BackupError {
    fn from(err: ConfigError) -> Self {
        BackupError::Config(err)
    }
}

impl From<ClusterError> for BackupError {
    fn from(err: ClusterError) -> Self {
        BackupError::Cluster(err)
    }
}

impl From<TaskError> for BackupError {
    fn from(err: TaskError) -> Self {
        BackupError::Task(err)
    }
}

impl From<RetentionError> for BackupError {
    fn from(err: RetentionError) -> Self {
        BackupError::Retention(err)
    }
}

impl From<HookError> for BackupError {
    fn from(err: HookError) -> Self {
        BackupError::Hook(err)
    }
}
