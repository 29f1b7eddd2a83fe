// In-memory service registry: staged state, dirty flags and save errors.

use super::model::{ServiceRecord, StartMode, unit_name};
use super::systemd::{self, CommandRunner};
use crate::error::{Error, Result};
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Every known service keyed by name. The map is ordered so that
/// iteration (and therefore commit and error order) is sorted by name.
#[derive(Debug, Default)]
pub struct Registry {
    pub(super) services: BTreeMap<String, ServiceRecord>,
    pub(super) modified: bool,
    pub(super) errors: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a freshly loaded snapshot, dropping all staged changes.
    pub(super) fn replace(&mut self, services: BTreeMap<String, ServiceRecord>) {
        self.services = services;
        self.modified = false;
    }

    pub fn get(&self, name: &str) -> Option<&ServiceRecord> {
        self.services.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.services.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Whether any record has staged changes.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn stage(&mut self, name: &str, change: impl FnOnce(&mut ServiceRecord)) {
        if let Some(record) = self.services.get_mut(name) {
            change(record);
            record.modified = true;
            self.modified = true;
        }
    }

    pub fn enable(&mut self, name: &str) {
        self.stage(name, |r| r.enabled = true);
    }

    pub fn disable(&mut self, name: &str) {
        self.stage(name, |r| r.enabled = false);
    }

    pub fn activate(&mut self, name: &str) {
        self.stage(name, |r| r.active = true);
    }

    pub fn deactivate(&mut self, name: &str) {
        self.stage(name, |r| r.active = false);
    }

    /// Units that failed to load have no install section to toggle.
    pub fn can_be_toggled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|r| r.loaded)
    }

    /// Stages the opposite enablement. Returns false if the service is
    /// unknown or cannot be toggled.
    pub fn toggle_enablement(&mut self, name: &str) -> bool {
        if !self.can_be_toggled(name) {
            return false;
        }
        self.stage(name, |r| r.enabled = !r.enabled);
        true
    }

    /// Stages the opposite run state.
    pub fn toggle_activity(&mut self, name: &str) -> bool {
        match self.is_active(name) {
            Some(true) => self.deactivate(name),
            Some(false) => self.activate(name),
            None => return false,
        }
        true
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.get(name).map(|r| r.enabled)
    }

    pub fn is_active(&self, name: &str) -> Option<bool> {
        self.get(name).map(|r| r.active)
    }

    pub fn start_mode(&self, name: &str) -> Option<StartMode> {
        self.get(name).map(ServiceRecord::start_mode)
    }

    pub fn set_start_mode(&mut self, name: &str, mode: StartMode) -> bool {
        if !self.can_be_toggled(name) {
            return false;
        }
        match mode {
            StartMode::OnBoot => self.enable(name),
            StartMode::Manually => self.disable(name),
        }
        true
    }

    /// Names of all services currently staged as enabled.
    pub fn export(&self) -> Vec<String> {
        self.records()
            .filter(|r| r.enabled)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Enables exactly the given services and disables every other known
    /// one. Returns the requested names that are not known on this system.
    pub fn import<S: AsRef<str>>(&mut self, names: &[S]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Err(Error::EmptyImport);
        }

        let wanted: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();
        let mut unknown = Vec::new();
        for name in &wanted {
            if self.services.contains_key(*name) {
                self.enable(name);
            } else {
                warn!("Service {} doesn't exist on this system", name);
                unknown.push(name.to_string());
            }
        }

        for name in self.names() {
            if !wanted.contains(name.as_str()) {
                self.disable(&name);
            }
        }

        info!(
            "Imported profile: {} enabled, {} unknown",
            wanted.len() - unknown.len(),
            unknown.len()
        );
        Ok(unknown)
    }

    /// Forgets errors and dirty flags. Staged values stay until the next load.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.modified = false;
        for record in self.services.values_mut() {
            record.modified = false;
        }
    }

    /// Free-form status text for one service.
    pub fn status(&self, runner: &dyn CommandRunner, name: &str) -> String {
        systemd::service_status(runner, &unit_name(name))
    }

    /// Journal of the current boot for one service and its socket units.
    pub fn logs(&self, runner: &dyn CommandRunner, name: &str) -> String {
        let unit = unit_name(name);
        let mut units = vec![unit.clone()];
        units.extend(systemd::triggering_sockets(runner, &unit));
        systemd::unit_logs(runner, &units)
    }
}
