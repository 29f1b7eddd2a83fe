// Commits staged changes to the system in two phases.
//
// Enablement is written first. Run state is only touched once every
// enablement change went through, and a failure in either phase never
// stops the remaining services of that phase.

use super::model::unit_name;
use super::registry::Registry;
use super::systemd::{self, CommandRunner, ServiceAction};
use log::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Write every service, not only the modified ones
    pub force: bool,
    /// Start enabled services and stop disabled ones after enabling
    pub switch: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            force: false,
            switch: true,
        }
    }
}

/// How a save ended. Failures carry their messages in `Registry::errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Committed,
    /// Errors from an earlier save were still pending; nothing was attempted
    Rejected,
    ToggleFailed,
    SwitchFailed,
}

impl SaveOutcome {
    pub fn is_success(&self) -> bool {
        *self == SaveOutcome::Committed
    }
}

enum Phase {
    Toggle,
    Switch,
}

impl Registry {
    pub fn save(&mut self, runner: &dyn CommandRunner, options: SaveOptions) -> SaveOutcome {
        if !self.errors.is_empty() {
            error!("Refusing to save: {} errors pending", self.errors.len());
            return SaveOutcome::Rejected;
        }

        // Fixed up front: the toggle phase clears the flags it commits.
        let selected: Vec<String> = self
            .services
            .values()
            .filter(|r| r.modified || options.force)
            .map(|r| r.name.clone())
            .collect();

        self.run_phase(runner, &selected, Phase::Toggle);
        if !self.errors.is_empty() {
            self.refresh_modified();
            return SaveOutcome::ToggleFailed;
        }

        if options.switch {
            self.run_phase(runner, &selected, Phase::Switch);
        }
        self.refresh_modified();

        if self.errors.is_empty() {
            SaveOutcome::Committed
        } else {
            SaveOutcome::SwitchFailed
        }
    }

    fn run_phase(&mut self, runner: &dyn CommandRunner, names: &[String], phase: Phase) {
        for name in names {
            let Some(record) = self.services.get(name) else {
                continue;
            };

            let action = match phase {
                Phase::Toggle if record.enabled => ServiceAction::Enable,
                Phase::Toggle => ServiceAction::Disable,
                Phase::Switch if !record.enabled => {
                    debug!("Not switching {}: service is disabled", name);
                    continue;
                }
                Phase::Switch if record.active => ServiceAction::Start,
                Phase::Switch => ServiceAction::Stop,
            };

            let unit = unit_name(name);
            let succeeded = match systemd::control_service(runner, &unit, action) {
                Ok(output) => output.success(),
                Err(e) => {
                    debug!("{}", e);
                    false
                }
            };

            if let Some(record) = self.services.get_mut(name) {
                record.modified = !succeeded;
            }

            if succeeded {
                info!("{} {}", action.as_str(), name);
            } else {
                let message = format!(
                    "Could not {} {}; {}",
                    action.as_str(),
                    name,
                    systemd::service_status(runner, &unit)
                );
                error!("Error: {}", message);
                self.errors.push(message);
            }
        }
    }

    fn refresh_modified(&mut self) {
        self.modified = self.services.values().any(|r| r.modified);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::registry::tests::registry_with;
    use crate::app::testing::{MockRunner, failure, success};

    #[test]
    fn test_nothing_modified_makes_no_calls() {
        let mut registry = registry_with(&[("sshd", true, true), ("cups", false, false)]);
        let runner = MockRunner::default();

        let outcome = registry.save(&runner, SaveOptions { force: false, switch: true });

        assert_eq!(outcome, SaveOutcome::Committed);
        assert!(outcome.is_success());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_toggle_then_switch_order() {
        let mut registry = registry_with(&[("sshd", false, false)]);
        registry.enable("sshd");
        registry.activate("sshd");
        let runner = MockRunner::default();

        let outcome = registry.save(&runner, SaveOptions::default());

        assert_eq!(outcome, SaveOutcome::Committed);
        assert_eq!(
            runner.calls(),
            vec![
                vec!["enable", "sshd.service", "--no-ask-password"],
                vec!["start", "sshd.service", "--no-ask-password"],
            ]
        );
        assert!(!registry.is_modified());
        assert!(!registry.get("sshd").unwrap().modified);
    }

    #[test]
    fn test_partial_toggle_failure() {
        let mut registry =
            registry_with(&[("alpha", false, false), ("bravo", false, false), ("charlie", false, false)]);
        for name in ["alpha", "bravo", "charlie"] {
            registry.enable(name);
        }
        let runner = MockRunner::default();
        runner.respond(&["enable", "bravo.service"], failure("Unit has no install section"));
        runner.respond(&["status", "bravo.service"], success("bravo.service - Bravo\n"));

        let outcome = registry.save(&runner, SaveOptions::default());

        assert_eq!(outcome, SaveOutcome::ToggleFailed);
        assert!(!outcome.is_success());
        assert_eq!(runner.calls_to("enable").len(), 3);
        assert_eq!(registry.errors(), ["Could not enable bravo; bravo.service - Bravo\n"]);
        assert!(!registry.get("alpha").unwrap().modified);
        assert!(registry.get("bravo").unwrap().modified);
        assert!(!registry.get("charlie").unwrap().modified);
        assert!(registry.is_modified());
    }

    #[test]
    fn test_unspawnable_systemctl_is_recorded() {
        use crate::app::systemd::Tool;

        let mut registry = registry_with(&[("alpha", false, false), ("bravo", false, false)]);
        registry.enable("alpha");
        registry.enable("bravo");
        let runner = MockRunner::default();
        runner.fail_to_spawn(Tool::Systemctl, &["enable", "bravo.service"]);

        let outcome = registry.save(&runner, SaveOptions::default());

        assert_eq!(outcome, SaveOutcome::ToggleFailed);
        assert_eq!(registry.errors().len(), 1);
        assert!(registry.errors()[0].starts_with("Could not enable bravo; "));
        assert!(!registry.get("alpha").unwrap().modified);
        assert!(registry.get("bravo").unwrap().modified);
        assert!(registry.is_modified());
        assert!(runner.calls_to("start").is_empty());
    }

    #[test]
    fn test_toggle_failure_skips_switch_phase() {
        let mut registry = registry_with(&[("alpha", false, false), ("bravo", true, true)]);
        registry.enable("alpha");
        registry.activate("alpha");
        registry.deactivate("bravo");
        let runner = MockRunner::default();
        runner.respond(&["enable", "alpha.service"], failure("denied"));

        registry.save(&runner, SaveOptions::default());

        assert!(runner.calls_to("start").is_empty());
        assert!(runner.calls_to("stop").is_empty());
    }

    #[test]
    fn test_pending_errors_reject_save() {
        let mut registry = registry_with(&[("sshd", false, false)]);
        registry.enable("sshd");
        registry.errors.push("Could not enable sshd; ".to_string());
        let runner = MockRunner::default();

        let outcome = registry.save(&runner, SaveOptions::default());

        assert_eq!(outcome, SaveOutcome::Rejected);
        assert!(runner.calls().is_empty());
        assert!(registry.get("sshd").unwrap().modified);
    }

    #[test]
    fn test_retry_after_reset() {
        let mut registry = registry_with(&[("sshd", false, false)]);
        registry.enable("sshd");
        let failing = MockRunner::default();
        failing.respond(&["enable"], failure("denied"));
        assert_eq!(registry.save(&failing, SaveOptions::default()), SaveOutcome::ToggleFailed);

        registry.reset();
        let runner = MockRunner::default();
        let outcome = registry.save(&runner, SaveOptions { force: true, switch: false });

        assert_eq!(outcome, SaveOutcome::Committed);
        assert_eq!(runner.calls(), vec![vec!["enable", "sshd.service", "--no-ask-password"]]);
    }

    #[test]
    fn test_disabled_service_is_never_started() {
        let mut registry = registry_with(&[("cups", true, false)]);
        registry.disable("cups");
        registry.activate("cups");
        let runner = MockRunner::default();

        let outcome = registry.save(&runner, SaveOptions::default());

        assert_eq!(outcome, SaveOutcome::Committed);
        assert_eq!(runner.calls(), vec![vec!["disable", "cups.service", "--no-ask-password"]]);
        assert!(!registry.get("cups").unwrap().modified);
    }

    #[test]
    fn test_switch_failure_keeps_record_modified() {
        let mut registry = registry_with(&[("alpha", true, true), ("bravo", true, true)]);
        registry.deactivate("alpha");
        registry.deactivate("bravo");
        let runner = MockRunner::default();
        runner.respond(&["stop", "alpha.service"], failure("Job canceled"));
        runner.respond(&["status", "alpha.service"], success("alpha.service - Alpha\n"));

        let outcome = registry.save(&runner, SaveOptions::default());

        assert_eq!(outcome, SaveOutcome::SwitchFailed);
        assert_eq!(runner.calls_to("enable").len(), 2);
        assert_eq!(runner.calls_to("stop").len(), 2);
        assert_eq!(registry.errors(), ["Could not stop alpha; alpha.service - Alpha\n"]);
        assert!(registry.get("alpha").unwrap().modified);
        assert!(!registry.get("bravo").unwrap().modified);
        assert!(registry.is_modified());
    }

    #[test]
    fn test_no_switch_skips_run_state() {
        let mut registry = registry_with(&[("sshd", false, false)]);
        registry.enable("sshd");
        registry.activate("sshd");
        let runner = MockRunner::default();

        registry.save(&runner, SaveOptions { force: false, switch: false });

        assert!(runner.calls_to("start").is_empty());
        assert_eq!(runner.calls_to("enable").len(), 1);
    }

    #[test]
    fn test_force_writes_every_service_in_name_order() {
        let mut registry = registry_with(&[("zed", true, true), ("atd", false, false)]);
        let runner = MockRunner::default();

        registry.save(&runner, SaveOptions { force: true, switch: true });

        assert_eq!(
            runner.calls(),
            vec![
                vec!["disable", "atd.service", "--no-ask-password"],
                vec!["enable", "zed.service", "--no-ask-password"],
                vec!["start", "zed.service", "--no-ask-password"],
            ]
        );
    }
}
