use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, Command};
use crate::cli::commands::{backup, exit_code, exit_for_error, interactive, media, schedule, show};
use crate::config::example::example_config_yaml;
use crate::config::load::{config_search_paths, find_config_file, load_config};
use crate::config::model::RuntimeConfig;
use crate::error::BackupError;
use crate::types::RunMode;

pub mod args;
pub mod commands;

pub fn run() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.verbose);
    let run_mode = RunMode { verbose: cli.verbose };

    let config = load_or_exit(cli.config.as_deref());
    let outcome = match &cli.command {
        Command::ShowVms => show::run_show_vms(&config, run_mode),
        Command::Backup(args) => backup::run_backup_command(&config, args, run_mode),
        Command::Restore(args) => backup::run_restore_command(&config, args, run_mode),
        Command::Schedule => schedule::run_schedule_command(&config, run_mode),
        Command::ShowBackups => show::run_show_backups(&config),
        Command::ShowQueue => show::run_show_queue(&config, run_mode),
        Command::InteractiveRestore => interactive::run_interactive_restore_command(&config, run_mode),
        Command::UploadDiskMedia(args) => media::run_upload_command(&config, args, run_mode),
    };
    if let Some(code) = settle(outcome)? {
        std::process::exit(code);
    }
    Ok(())
}

// Failures already written to stderr (and mailed) only decide the exit code.
fn settle(outcome: crate::error::Result<()>) -> Result<Option<i32>> {
    match outcome {
        Ok(()) => Ok(None),
        Err(BackupError::Reported(err)) => Ok(Some(exit_code(&err))),
        Err(err) => Err(err.into()),
    }
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                std::process::exit(0);
            }
            let _ = err.print();
            std::process::exit(2);
        }
    }
}

fn load_or_exit(explicit: Option<&Path>) -> RuntimeConfig {
    let path: PathBuf = match explicit.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => path,
        None => {
            print_missing_config();
            std::process::exit(2);
        }
    };
    match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config {}:", path.display());
            exit_for_error(&err)
        }
    }
}

fn print_missing_config() {
    eprintln!("No config file found. Looked in:");
    for path in config_search_paths() {
        eprintln!("  {}", path.display());
    }
    match example_config_yaml() {
        Ok(yaml) => {
            eprintln!();
            eprintln!("Example config:");
            eprintln!("{}", yaml);
        }
        Err(err) => eprintln!("{}", err),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
