// Non-interactive subcommands

use crate::app::loader;
use crate::app::model::{service_name, unit_name};
use crate::app::profile::Profile;
use crate::app::reconcile::{SaveOptions, SaveOutcome};
use crate::app::registry::Registry;
use crate::app::systemd::{self, CommandRunner};
use crate::app::target::TargetSelector;
use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::path::Path;

/// Requested change for a single service; `None` leaves a value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Change {
    pub enable: Option<bool>,
    pub active: Option<bool>,
}

fn load_registry(runner: &dyn CommandRunner) -> Result<Registry> {
    let mut registry = Registry::new();
    loader::load(&mut registry, runner).context("Failed to read services")?;
    Ok(registry)
}

/// Turns a failed save into an error listing every message.
fn report(outcome: SaveOutcome, registry: &Registry) -> Result<()> {
    match outcome {
        SaveOutcome::Committed => {
            println!("Changes committed");
            Ok(())
        }
        SaveOutcome::Rejected => bail!("Earlier errors are still pending"),
        SaveOutcome::ToggleFailed | SaveOutcome::SwitchFailed => {
            for error in registry.errors() {
                eprintln!("{}", error.trim_end());
            }
            bail!("Writing the configuration failed")
        }
    }
}

pub fn list(runner: &dyn CommandRunner) -> Result<()> {
    let registry = load_registry(runner)?;
    if registry.is_empty() {
        println!("No services found");
        return Ok(());
    }

    println!("{:<40} {:<9} {:<9} DESCRIPTION", "SERVICE", "START", "ACTIVE");
    for record in registry.records() {
        let active = if record.active { "active" } else { "inactive" };
        let description = if record.loaded {
            record.description.clone()
        } else {
            format!("(not loaded) {}", record.description)
        };
        println!(
            "{:<40} {:<9} {:<9} {}",
            record.name,
            record.start_mode().label(),
            active,
            description
        );
    }
    println!("\n{} services", registry.len());
    Ok(())
}

pub fn status(runner: &dyn CommandRunner, name: &str) -> Result<()> {
    print!("{}", systemd::service_status(runner, &unit_name(service_name(name))));
    Ok(())
}

pub fn export(runner: &dyn CommandRunner, output: Option<&Path>) -> Result<()> {
    let registry = load_registry(runner)?;
    let profile = Profile::from_registry(&registry);

    match output {
        Some(path) => {
            profile
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported {} enabled services to {}", profile.services.len(), path.display());
        }
        None => println!("{}", profile.to_json()?),
    }
    Ok(())
}

pub fn import(runner: &dyn CommandRunner, file: &Path, force: bool, switch: bool) -> Result<()> {
    let profile =
        Profile::load(file).with_context(|| format!("Failed to read profile {}", file.display()))?;
    let mut registry = load_registry(runner)?;

    let unknown = registry.import(&profile.services)?;
    for name in &unknown {
        eprintln!("Skipping unknown service: {}", name);
    }

    let outcome = registry.save(runner, SaveOptions { force, switch });
    report(outcome, &registry)
}

pub fn set(runner: &dyn CommandRunner, name: &str, change: Change, switch: bool) -> Result<()> {
    let name = service_name(name);
    let mut registry = load_registry(runner)?;
    if registry.get(name).is_none() {
        bail!("Unknown service: {}", name);
    }

    match change.enable {
        Some(true) => registry.enable(name),
        Some(false) => registry.disable(name),
        None => {}
    }
    match change.active {
        Some(true) => registry.activate(name),
        Some(false) => registry.deactivate(name),
        None => {}
    }

    // Run state changes are skipped for disabled services
    if registry.is_enabled(name) == Some(false) {
        match change.active {
            Some(true) => bail!("Cannot start {}: the service is disabled (add --enable)", name),
            Some(false) => warn!("{} is disabled, it will not be stopped", name),
            None => {}
        }
    }

    let outcome = registry.save(runner, SaveOptions { force: false, switch });
    report(outcome, &registry)
}

pub fn default_target(runner: &dyn CommandRunner, name: Option<&str>) -> Result<()> {
    let mut targets = TargetSelector::load(runner).context("Failed to read systemd targets")?;

    match name {
        Some(name) => {
            targets.set_default(name)?;
            targets.save(runner).context("Failed to set the default target")?;
            println!("Default target: {}", targets.get_default());
        }
        None => {
            for target in targets.list() {
                let marker = if target.is_default { "*" } else { " " };
                println!("{} {:<20} {}", marker, target.name, target.label);
            }
        }
    }
    Ok(())
}
