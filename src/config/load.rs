use std::env;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use lettre::message::Mailbox;
use tracing::warn;

use crate::config::duration::{parse_duration, parse_time_of_day};
use crate::config::model::{
    Config, RetentionPolicy, RuntimeConfig, Schedule, ScheduleConfig, SmtpConfig,
};
use crate::error::{BackupError, ConfigError, Result};
use crate::window::ScheduleWindow;

pub const CONFIG_ENV: &str = "SCALE_BACKUP_CONFIG";
const CONFIG_FILE_NAME: &str = "scale-backup.yaml";
const SYSTEM_CONFIG_FILE: &str = "/etc/scale-backup.yaml";
const DEFAULT_CONCURRENCY: usize = 3;
const MAX_CONCURRENCY: usize = 3;
const DEFAULT_SMTP_PORT: u16 = 25;

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.is_empty() {
            paths.push(PathBuf::from(path));
        }
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    if let Ok(home) = env::var("HOME") {
        paths.push(Path::new(&home).join(format!(".{CONFIG_FILE_NAME}")));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG_FILE));
    paths
}

pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|p| p.is_file())
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let mut contents = String::new();
    File::open(path)
        .map_err(|e| BackupError::message(format!("open config {}: {}", path.display(), e)))?
        .read_to_string(&mut contents)
        .map_err(|e| BackupError::message(format!("read config {}: {}", path.display(), e)))?;
    let cfg: Config =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    parse_runtime(cfg)
}

fn required(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{what} not set")).into());
    }
    Ok(())
}

fn parse_runtime(cfg: Config) -> Result<RuntimeConfig> {
    required(&cfg.share.username, "share username")?;
    required(&cfg.share.password, "share password")?;
    required(&cfg.share.host, "share host")?;
    required(&cfg.share.share_name, "share shareName")?;
    required(&cfg.share.local_path, "share localPath")?;
    required(&cfg.cluster.host, "cluster host")?;
    required(&cfg.cluster.username, "cluster username")?;
    required(&cfg.cluster.password, "cluster password")?;

    if cfg.share.share_name.contains('/') {
        return Err(ConfigError::Invalid("share shareName should not contain slashes".to_string()).into());
    }
    if cfg.share.share_name.contains('\\') {
        return Err(
            ConfigError::Invalid("share shareName should not contain backslashes".to_string()).into(),
        );
    }

    let local_path = PathBuf::from(&cfg.share.local_path);
    match std::fs::metadata(&local_path) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(ConfigError::Invalid(format!(
                "share localPath {} is not a directory",
                local_path.display()
            ))
            .into())
        }
        Err(e) => {
            return Err(ConfigError::Invalid(format!(
                "share localPath {}: {}",
                local_path.display(),
                e
            ))
            .into())
        }
    }

    let schedule = match cfg.schedule {
        Some(schedule) if !schedule.tag.trim().is_empty() => Some(parse_schedule(schedule)?),
        _ => None,
    };

    let hooks = cfg.hooks;
    if hooks.delay_post_backup_when_scheduled && hooks.post_backup.is_none() {
        return Err(ConfigError::Invalid(
            "delayPostBackupWhenScheduled is set but postBackup is not; there is nothing to delay"
                .to_string(),
        )
        .into());
    }

    let smtp = match cfg.smtp {
        Some(smtp) if !smtp.host.trim().is_empty() => Some(parse_smtp(smtp)?),
        _ => {
            warn!("smtp is not configured; no email notifications will be sent");
            None
        }
    };

    Ok(RuntimeConfig {
        share: cfg.share,
        local_path,
        cluster: cfg.cluster,
        smtp,
        schedule,
        hooks,
    })
}

fn parse_schedule(cfg: ScheduleConfig) -> Result<Schedule> {
    let concurrency = match cfg.concurrency {
        None | Some(0) => DEFAULT_CONCURRENCY,
        Some(n) if n <= MAX_CONCURRENCY => n,
        Some(_) => {
            return Err(ConfigError::Invalid(format!(
                "schedule concurrency must be between 1 and {MAX_CONCURRENCY}"
            ))
            .into())
        }
    };

    let start = parse_time_of_day(&cfg.start_time)
        .map_err(|e| ConfigError::Invalid(format!("schedule startTime: {e}")))?;
    let end = parse_time_of_day(&cfg.end_time)
        .map_err(|e| ConfigError::Invalid(format!("schedule endTime: {e}")))?;
    let backup_interval = parse_duration(&cfg.backup_interval)
        .map_err(|e| ConfigError::Invalid(format!("schedule backupInterval: {e}")))?;
    let tolerance = match cfg.tolerance.as_deref() {
        Some(value) => parse_duration(value)
            .map_err(|e| ConfigError::Invalid(format!("schedule tolerance: {e}")))?,
        None => std::time::Duration::ZERO,
    };

    let max_backups = cfg.max_backups.filter(|n| *n > 0);
    let max_age = match cfg.max_age.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(value) => Some(
            parse_duration(value)
                .map_err(|e| ConfigError::Invalid(format!("schedule maxAge: {e}")))?,
        ),
        None => None,
    };
    if max_backups.is_none() && max_age.is_none() {
        return Err(ConfigError::Invalid("neither maxBackups nor maxAge is set".to_string()).into());
    }
    if max_age.is_none() {
        warn!("schedule maxAge not set; backups from deleted VMs will never be deleted");
    }

    Ok(Schedule {
        tag: cfg.tag,
        concurrency,
        window: ScheduleWindow::new(start, end),
        backup_interval,
        tolerance,
        retention: RetentionPolicy {
            max_age,
            max_backups,
        },
    })
}

fn check_address(value: &str, what: &str) -> Result<()> {
    value
        .parse::<Mailbox>()
        .map(|_| ())
        .map_err(|e| ConfigError::Invalid(format!("smtp {what} is not a valid email address: {e}")).into())
}

fn parse_smtp(mut smtp: SmtpConfig) -> Result<SmtpConfig> {
    if smtp.port.unwrap_or(0) == 0 {
        smtp.port = Some(DEFAULT_SMTP_PORT);
    }
    check_address(&smtp.from, "from")?;
    check_address(&smtp.to, "to")?;
    Ok(smtp)
}
