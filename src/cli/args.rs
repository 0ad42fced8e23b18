use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::VmName;

#[derive(Parser, Debug)]
#[command(
    name = "scale-backup",
    version,
    about = "Export VMs from the cluster to an SMB share on a schedule"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path (default: search SCALE_BACKUP_CONFIG, ./, ~/, /etc)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List VMs on the cluster
    ShowVms,
    /// Export one VM now
    Backup(BackupArgs),
    /// Import a backup as a new VM
    Restore(RestoreArgs),
    /// Pick a backup and a new VM name from prompts, then restore
    InteractiveRestore,
    /// Run the scheduled backups for the current window
    Schedule,
    /// List backups on the share
    ShowBackups,
    /// List VMs due for backup, oldest first
    ShowQueue,
    /// Upload an ISO or disk image to the cluster's media library
    UploadDiskMedia(UploadArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    pub vm: String,
    pub backup_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    pub backup_name: String,
    pub new_vm_name: VmName,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    pub filename: PathBuf,
}
