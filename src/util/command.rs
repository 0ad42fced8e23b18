use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{BackupError, Result};
use crate::types::RunMode;

pub fn maybe_print_command(cmd: &Command, run_mode: RunMode) {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    debug!(program = %program, args = ?args, "running command");
    if run_mode.verbose {
        println!("{} {}", program, args.join(" "));
    }
}

/// Runs `cmd` with inherited stdout/stderr and returns its exit code.
pub fn run_command(cmd: &mut Command, run_mode: RunMode) -> Result<i32> {
    maybe_print_command(cmd, run_mode);
    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| BackupError::message(format!("{}: {}", cmd.get_program().to_string_lossy(), e)))?;
    Ok(status.code().unwrap_or(1))
}
