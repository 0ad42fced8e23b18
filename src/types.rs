use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};

pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Directory name of one backup on the share: `"<YYYY-MM-DD_HH-MM-SS> <vm>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupName {
    created: NaiveDateTime,
    vm: String,
}

impl BackupName {
    pub fn new(created: NaiveDateTime, vm: &str) -> Self {
        let created = created.with_nanosecond(0).unwrap_or(created);
        BackupName {
            created,
            vm: vm.to_string(),
        }
    }

    pub fn created(&self) -> NaiveDateTime {
        self.created
    }

    pub fn vm(&self) -> &str {
        &self.vm
    }
}

impl FromStr for BackupName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, vm) = s
            .split_once(' ')
            .ok_or_else(|| format!("{s}: expected \"<timestamp> <vm name>\""))?;
        if vm.is_empty() {
            return Err(format!("{s}: vm name is empty"));
        }
        let created = NaiveDateTime::parse_from_str(prefix, BACKUP_TIME_FORMAT)
            .map_err(|e| format!("{s}: {e}"))?;
        Ok(BackupName {
            created,
            vm: vm.to_string(),
        })
    }
}

impl fmt::Display for BackupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.created.format(BACKUP_TIME_FORMAT), self.vm)
    }
}

/// Name for a VM created by a restore.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VmName(String);

impl VmName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for VmName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("VM name cannot be empty".to_string());
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err("VM name can only contain letters, numbers, dashes, and underscores".to_string());
        }
        Ok(VmName(s.to_string()))
    }
}

impl fmt::Display for VmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote task state as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Uninitialized,
    Queued,
    Running,
    Complete,
    Error,
    Unknown(String),
}

impl TaskState {
    pub fn parse(value: &str) -> Self {
        match value {
            "UNINITIALIZED" => TaskState::Uninitialized,
            "QUEUED" => TaskState::Queued,
            "RUNNING" => TaskState::Running,
            "COMPLETE" => TaskState::Complete,
            "ERROR" => TaskState::Error,
            other => TaskState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Uninitialized => "UNINITIALIZED",
            TaskState::Queued => "QUEUED",
            TaskState::Running => "RUNNING",
            TaskState::Complete => "COMPLETE",
            TaskState::Error => "ERROR",
            TaskState::Unknown(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    pub verbose: bool,
}
