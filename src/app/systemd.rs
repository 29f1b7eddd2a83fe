// Handles all interactions with the `systemctl` and `journalctl` commands.

use crate::error::{Error, Result};
use log::{debug, trace};
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// Options that keep listing output machine readable.
const LISTING_OPTIONS: [&str; 3] = ["--no-legend", "--no-pager", "--no-ask-password"];

/// Captured result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

/// Host programs the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Systemctl,
    Journalctl,
}

/// Runs a host tool with the given arguments.
pub trait CommandRunner {
    fn run(&self, tool: Tool, args: &[&str]) -> io::Result<CommandOutput>;
}

/// The real systemctl and journalctl binaries.
#[derive(Debug, Clone)]
pub struct HostRunner {
    systemctl: PathBuf,
    journalctl: PathBuf,
    user: bool,
}

impl HostRunner {
    pub fn new(systemctl: impl Into<PathBuf>, journalctl: impl Into<PathBuf>, user: bool) -> Self {
        Self {
            systemctl: systemctl.into(),
            journalctl: journalctl.into(),
            user,
        }
    }
}

impl Default for HostRunner {
    fn default() -> Self {
        Self::new("systemctl", "journalctl", false)
    }
}

impl CommandRunner for HostRunner {
    fn run(&self, tool: Tool, args: &[&str]) -> io::Result<CommandOutput> {
        let program = match tool {
            Tool::Systemctl => &self.systemctl,
            Tool::Journalctl => &self.journalctl,
        };
        let mut cmd = Command::new(program);
        // Plain, untranslated, unwrapped output
        cmd.env("LANG", "C").env("TERM", "dumb").env("COLUMNS", "1024");
        if self.user {
            cmd.arg("--user");
        }
        cmd.args(args);

        trace!("Running {} {}", program.display(), args.join(" "));
        let output = cmd.output()?;
        let status_code = output
            .status
            .code()
            .unwrap_or(if output.status.success() { 0 } else { 1 });

        Ok(CommandOutput {
            status_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Changes systemctl can apply to a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Enable,
    Disable,
    Start,
    Stop,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
        }
    }
}

/// Runs a listing command, failing on spawn errors and nonzero exits.
fn run_listing(runner: &dyn CommandRunner, args: &[&str]) -> Result<String> {
    let mut full: Vec<&str> = args.to_vec();
    full.extend_from_slice(&LISTING_OPTIONS);

    let command = args.join(" ");
    let output = runner.run(Tool::Systemctl, &full).map_err(|source| Error::Spawn {
        command: command.clone(),
        source,
    })?;

    if !output.success() {
        return Err(Error::CommandFailed {
            command,
            code: output.status_code,
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Lists service unit files with their enablement state.
/// Each line: `<name>.service <state> [preset]`
pub fn list_unit_files(runner: &dyn CommandRunner) -> Result<String> {
    run_listing(runner, &["list-unit-files", "--type=service"])
}

/// Lists all service units with their load and activation state.
/// Each line: `<name>.service <load> <active> <sub> <description...>`
pub fn list_units(runner: &dyn CommandRunner) -> Result<String> {
    run_listing(runner, &["list-units", "--all", "--type=service", "--plain"])
}

/// Lists all target units, same shape as [`list_units`].
pub fn list_targets(runner: &dyn CommandRunner) -> Result<String> {
    run_listing(runner, &["list-units", "--all", "--type=target", "--plain"])
}

/// Shows selected properties of the given units as `Key=Value` blocks.
pub fn show_properties(
    runner: &dyn CommandRunner,
    units: &[String],
    properties: &[&str],
) -> Result<String> {
    let property_arg = format!("--property={}", properties.join(","));
    let mut args: Vec<&str> = vec!["show", property_arg.as_str()];
    args.extend(units.iter().map(String::as_str));
    run_listing(runner, &args)
}

pub fn get_default(runner: &dyn CommandRunner) -> Result<String> {
    Ok(run_listing(runner, &["get-default"])?.trim().to_string())
}

pub fn set_default(runner: &dyn CommandRunner, unit: &str) -> Result<()> {
    run_listing(runner, &["set-default", unit]).map(|_| ())
}

/// Applies one action to one unit.
pub fn control_service(
    runner: &dyn CommandRunner,
    unit: &str,
    action: ServiceAction,
) -> Result<CommandOutput> {
    let output = runner
        .run(Tool::Systemctl, &[action.as_str(), unit, "--no-ask-password"])
        .map_err(|source| Error::Spawn {
            command: format!("{} {}", action.as_str(), unit),
            source,
        })?;
    debug!(
        "systemctl {} {} exited with {}",
        action.as_str(),
        unit,
        output.status_code
    );
    Ok(output)
}

/// Full unformatted status text of one unit, stdout and stderr combined.
/// `systemctl status` exits nonzero for inactive units, so the exit code is ignored.
pub fn service_status(runner: &dyn CommandRunner, unit: &str) -> String {
    match runner.run(Tool::Systemctl, &["status", unit, "--no-pager"]) {
        Ok(output) => combined(output),
        Err(e) => format!("Failed to query status of {}: {}", unit, e),
    }
}

fn combined(output: CommandOutput) -> String {
    let mut text = output.stdout;
    text.push_str(&output.stderr);
    text
}

/// Socket units that activate the given service.
pub fn triggering_sockets(runner: &dyn CommandRunner, unit: &str) -> Vec<String> {
    match run_listing(runner, &["show", "--property=TriggeredBy", "--value", unit]) {
        Ok(stdout) => stdout
            .split_whitespace()
            .filter(|u| u.ends_with(".socket"))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            debug!("No triggering units for {}: {}", unit, e);
            Vec::new()
        }
    }
}

/// Journal entries of the current boot for the given units.
pub fn unit_logs(runner: &dyn CommandRunner, units: &[String]) -> String {
    let mut args = vec!["-b", "--no-pager"];
    for unit in units {
        args.push("-u");
        args.push(unit);
    }

    match runner.run(Tool::Journalctl, &args) {
        Ok(output) => combined(output),
        Err(e) => format!("Failed to read the journal: {}", e),
    }
}
