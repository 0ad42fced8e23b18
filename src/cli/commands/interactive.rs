use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use crate::backup::run_restore;
use crate::catalog::Catalog;
use crate::cli::commands::build_services;
use crate::cli::commands::show::LISTING_TIME_FORMAT;
use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, Result};
use crate::types::{BackupName, RunMode, VmName};

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(BackupError::message("input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Index of the chosen item. Asks again until the answer is in range.
    pub fn select(&mut self, label: &str, items: &[String]) -> Result<usize> {
        if items.is_empty() {
            return Err(BackupError::message(format!("{}: nothing to choose from", label)));
        }
        writeln!(self.output, "{}", label)?;
        for (i, item) in items.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, item)?;
        }
        loop {
            let answer = self.ask("Number")?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=items.len()).contains(&n) => return Ok(n - 1),
                _ => writeln!(self.output, "Enter a number between 1 and {}", items.len())?,
            }
        }
    }

    pub fn text<T>(&mut self, label: &str, validate: impl Fn(&str) -> std::result::Result<T, String>) -> Result<T> {
        loop {
            let answer = self.ask(label)?;
            match validate(&answer) {
                Ok(value) => return Ok(value),
                Err(reason) => writeln!(self.output, "{}", reason)?,
            }
        }
    }

    pub fn confirm(&mut self, label: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} [y/N]", label))?;
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreChoice {
    pub backup: BackupName,
    pub new_vm: VmName,
}

/// Walks the operator through VM, backup and new name. `None` means the
/// operator declined the final confirmation.
pub fn choose_restore<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    catalog: &Catalog,
    existing: &BTreeMap<String, String>,
) -> Result<Option<RestoreChoice>> {
    if catalog.is_empty() {
        return Err(BackupError::message("No backups found on the share"));
    }
    let vms: Vec<String> = catalog.iter().map(|(vm, _)| vm.to_string()).collect();
    let vm = &vms[prompt.select("Select a VM to restore", &vms)?];

    let times = catalog.backups_for(vm);
    let labels: Vec<String> = times
        .iter()
        .map(|t| t.format(LISTING_TIME_FORMAT).to_string())
        .collect();
    let created = times[prompt.select("Select a backup to restore", &labels)?];

    let new_vm = prompt.text("Enter a new name for the restored VM", |input| {
        let name: VmName = input.parse()?;
        if existing.contains_key(name.as_str()) {
            return Err("VM name already exists".to_string());
        }
        Ok(name)
    })?;

    let question = format!(
        "Restore {} from {} as {}",
        vm,
        created.format(LISTING_TIME_FORMAT),
        new_vm
    );
    if !prompt.confirm(&question)? {
        return Ok(None);
    }
    Ok(Some(RestoreChoice {
        backup: BackupName::new(created, vm),
        new_vm,
    }))
}

pub fn run_interactive_restore_command(config: &RuntimeConfig, run_mode: RunMode) -> Result<()> {
    let services = build_services(config, run_mode)?;
    let catalog = Catalog::scan(&services.local_path)?;
    let existing = services
        .cluster
        .list_vms(None)
        .map_err(|e| BackupError::message(format!("Failed to get list of VMs: {}", e)))?;

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout());
    match choose_restore(&mut prompt, &catalog, &existing)? {
        Some(choice) => run_restore(&services, &choice.backup.to_string(), &choice.new_vm),
        None => {
            println!("Restore cancelled");
            Ok(())
        }
    }
}
