use crate::config::model::{
    ClusterConfig, Config, HooksConfig, ScheduleConfig, ShareConfig, SmtpConfig,
};
use crate::error::{BackupError, Result};

/// A filled-in config printed when no config file can be found.
pub fn example_config() -> Config {
    Config {
        share: ShareConfig {
            domain: Some("CONTOSO".to_string()),
            username: "JohnDoe".to_string(),
            password: "pa$$w0rd".to_string(),
            host: "fileserver.contoso.com".to_string(),
            share_name: "ServerBackups".to_string(),
            local_path: "/mnt/backups".to_string(),
        },
        cluster: ClusterConfig {
            host: "scale.cluster.local".to_string(),
            username: "admin".to_string(),
            password: "P@ssword".to_string(),
            accept_invalid_certs: false,
        },
        smtp: Some(SmtpConfig {
            host: "smtp.office365.com".to_string(),
            port: Some(25),
            from: "scale-backups@contoso-corp.com".to_string(),
            to: "ops-team@contoso-corp.com".to_string(),
        }),
        schedule: Some(ScheduleConfig {
            tag: "BackMeUp".to_string(),
            concurrency: Some(3),
            start_time: "5:00 PM".to_string(),
            end_time: "6:00 AM".to_string(),
            backup_interval: "7 days".to_string(),
            tolerance: Some("1 day".to_string()),
            max_backups: Some(7),
            max_age: Some("30 days".to_string()),
        }),
        hooks: HooksConfig {
            pre_backup: Some("/path/to/program {{VMName}} {{LocalPath}}/{{BackupName}}".to_string()),
            post_backup: Some("/path/to/program {{VMName}} {{LocalPath}}/{{BackupName}}".to_string()),
            pre_restore: Some(
                "/path/to/program {{NewVMName}} {{LocalPath}}/{{BackupName}}".to_string(),
            ),
            post_restore: Some(
                "/path/to/program {{NewVMName}} {{LocalPath}}/{{BackupName}}".to_string(),
            ),
            pre_schedule: Some("/path/to/program {{LocalPath}}".to_string()),
            post_schedule: Some("/path/to/program {{LocalPath}}".to_string()),
            delay_post_backup_when_scheduled: false,
        },
    }
}

pub fn example_config_yaml() -> Result<String> {
    serde_yaml::to_string(&example_config())
        .map_err(|e| BackupError::message(format!("encode example config: {}", e)))
}
