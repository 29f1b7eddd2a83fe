// Default boot target selection.

use super::systemd::{self, CommandRunner};
use crate::error::{Error, Result};
use log::{debug, info};
use std::collections::BTreeMap;

const TARGET_SUFFIX: &str = ".target";

/// Friendly labels for the well known base targets.
const BASE_TARGETS: [(&str, &str); 2] = [("graphical", "Graphical mode"), ("multi-user", "Text mode")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub name: String,
    pub label: String,
    pub is_default: bool,
}

/// Isolatable targets and the staged default among them.
#[derive(Debug, Default)]
pub struct TargetSelector {
    targets: BTreeMap<String, String>, // name -> description
    default_target: String,
    modified: bool,
}

fn strip_target(unit: &str) -> &str {
    unit.strip_suffix(TARGET_SUFFIX).unwrap_or(unit)
}

/// Parses `systemctl show` blocks, keeping targets that allow isolation.
fn parse_isolatable(stdout: &str) -> BTreeMap<String, String> {
    let mut targets = BTreeMap::new();

    for block in stdout.split("\n\n") {
        let mut id = None;
        let mut description = String::new();
        let mut isolate = false;

        for line in block.lines() {
            match line.split_once('=') {
                Some(("Id", value)) => id = Some(strip_target(value.trim())),
                Some(("Description", value)) => description = value.trim().to_string(),
                Some(("AllowIsolate", value)) => isolate = value.trim() == "yes",
                _ => {}
            }
        }

        if let Some(id) = id.filter(|_| isolate) {
            targets.insert(id.to_string(), description);
        }
    }

    targets
}

impl TargetSelector {
    /// Reads the current default and every isolatable target.
    pub fn load(runner: &dyn CommandRunner) -> Result<Self> {
        let units: Vec<String> = systemd::list_targets(runner)?
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter(|unit| unit.ends_with(TARGET_SUFFIX))
            .map(str::to_string)
            .collect();

        let targets = if units.is_empty() {
            BTreeMap::new()
        } else {
            let shown =
                systemd::show_properties(runner, &units, &["Id", "AllowIsolate", "Description"])?;
            parse_isolatable(&shown)
        };

        let default_target = strip_target(&systemd::get_default(runner)?).to_string();
        debug!("Targets: {:?}, default {}", targets.keys(), default_target);

        Ok(Self {
            targets,
            default_target,
            modified: false,
        })
    }

    pub fn list(&self) -> Vec<TargetEntry> {
        self.targets
            .iter()
            .map(|(name, description)| TargetEntry {
                name: name.clone(),
                label: label_for(name, description),
                is_default: *name == self.default_target,
            })
            .collect()
    }

    pub fn get_default(&self) -> &str {
        &self.default_target
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Stages a new default target.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        let name = strip_target(name);
        if !self.targets.contains_key(name) {
            return Err(Error::UnknownTarget(name.to_string()));
        }
        if name != self.default_target {
            info!("Setting new default target '{}'", name);
            self.default_target = name.to_string();
            self.modified = true;
        }
        Ok(())
    }

    /// Stages the next target in name order, wrapping around.
    pub fn cycle_default(&mut self) -> Result<()> {
        let names: Vec<&String> = self.targets.keys().collect();
        let Some(first) = names.first() else {
            return Ok(());
        };
        let next = names
            .iter()
            .position(|n| **n == self.default_target)
            .and_then(|i| names.get(i + 1))
            .unwrap_or(first)
            .to_string();
        self.set_default(&next)
    }

    /// Writes the default target if it was changed.
    pub fn save(&mut self, runner: &dyn CommandRunner) -> Result<()> {
        if !self.modified {
            return Ok(());
        }
        systemd::set_default(runner, &format!("{}{}", self.default_target, TARGET_SUFFIX))?;
        self.modified = false;
        Ok(())
    }

    /// Re-reads everything from the system.
    pub fn reset(&mut self, runner: &dyn CommandRunner) -> Result<()> {
        *self = Self::load(runner)?;
        Ok(())
    }
}

fn label_for(name: &str, description: &str) -> String {
    BASE_TARGETS
        .iter()
        .find(|(base, _)| *base == name)
        .map(|(_, label)| label.to_string())
        .or_else(|| (!description.is_empty()).then(|| description.to_string()))
        .unwrap_or_else(|| name.to_string())
}
