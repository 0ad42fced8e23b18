use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::window::ScheduleWindow;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub share: ShareConfig,
    pub cluster: ClusterConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleConfig>,
    #[serde(default)]
    pub hooks: HooksConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ShareConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, rename = "shareName")]
    pub share_name: String,
    #[serde(default, rename = "localPath")]
    pub local_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ClusterConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "acceptInvalidCerts")]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ScheduleConfig {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(rename = "backupInterval")]
    pub backup_interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<String>,
    #[serde(default, rename = "maxBackups", skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<usize>,
    #[serde(default, rename = "maxAge", skip_serializing_if = "Option::is_none")]
    pub max_age: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HooksConfig {
    #[serde(default, rename = "preBackup", skip_serializing_if = "Option::is_none")]
    pub pre_backup: Option<String>,
    #[serde(default, rename = "postBackup", skip_serializing_if = "Option::is_none")]
    pub post_backup: Option<String>,
    #[serde(default, rename = "preRestore", skip_serializing_if = "Option::is_none")]
    pub pre_restore: Option<String>,
    #[serde(default, rename = "postRestore", skip_serializing_if = "Option::is_none")]
    pub post_restore: Option<String>,
    #[serde(default, rename = "preSchedule", skip_serializing_if = "Option::is_none")]
    pub pre_schedule: Option<String>,
    #[serde(default, rename = "postSchedule", skip_serializing_if = "Option::is_none")]
    pub post_schedule: Option<String>,
    #[serde(default, rename = "delayPostBackupWhenScheduled")]
    pub delay_post_backup_when_scheduled: bool,
}

/// Validated configuration with parsed times and durations.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub share: ShareConfig,
    pub local_path: PathBuf,
    pub cluster: ClusterConfig,
    pub smtp: Option<SmtpConfig>,
    pub schedule: Option<Schedule>,
    pub hooks: HooksConfig,
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub tag: String,
    pub concurrency: usize,
    pub window: ScheduleWindow,
    pub backup_interval: Duration,
    pub tolerance: Duration,
    pub retention: RetentionPolicy,
}

/// Limits for the retention engine. At least one is set once validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Option<Duration>,
    pub max_backups: Option<usize>,
}

impl Schedule {
    pub fn start(&self) -> NaiveTime {
        self.window.start()
    }

    pub fn end(&self) -> NaiveTime {
        self.window.end()
    }
}
