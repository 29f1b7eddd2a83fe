// The central application controller and event loop.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::{info, warn};
use ratatui::{Terminal, backend::Backend, widgets::TableState};

pub mod loader;
pub mod model;
pub mod profile;
pub mod reconcile;
pub mod registry;
pub mod systemd;
pub mod target;
pub mod ui;

#[cfg(test)]
pub mod testing;

use model::StartMode;
use reconcile::SaveOptions;
use registry::Registry;
use systemd::CommandRunner;
use target::TargetSelector;

/// Everything the user can ask for, decoded once from key presses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Next,
    Previous,
    ToggleEnablement { service: String },
    ToggleRunning { service: String },
    SetStartMode { service: String, mode: StartMode },
    ShowDetails { service: String },
    ShowLogs { service: String },
    CycleTarget,
    Save,
    Reload,
    Quit,
    ScrollUp,
    ScrollDown,
    Confirm,
    Dismiss,
}

/// Overlay drawn above the services table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Details {
        service: String,
        text: String,
        scroll: u16,
    },
    Logs {
        service: String,
        lines: Vec<String>,
        scroll: u16,
    },
    Errors(Vec<String>),
    ConfirmQuit,
}

/// Maps a key to an action, given the open popup and the selected service.
pub fn decode(key: KeyCode, popup: Option<&Popup>, selected: Option<&str>) -> Option<Action> {
    match popup {
        Some(Popup::ConfirmQuit) => match key {
            KeyCode::Char('y') => Some(Action::Confirm),
            _ => Some(Action::Dismiss),
        },
        Some(Popup::Details { .. }) => match key {
            KeyCode::Char('j') | KeyCode::Down => Some(Action::ScrollDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::ScrollUp),
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('d') => Some(Action::Dismiss),
            _ => None,
        },
        Some(Popup::Logs { .. }) => match key {
            KeyCode::Char('j') | KeyCode::Down => Some(Action::ScrollDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::ScrollUp),
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('l') => Some(Action::Dismiss),
            _ => None,
        },
        Some(Popup::Errors(_)) => Some(Action::Dismiss),
        None => {
            let service = selected.map(str::to_string);
            match key {
                KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
                KeyCode::Char('j') | KeyCode::Down => Some(Action::Next),
                KeyCode::Char('k') | KeyCode::Up => Some(Action::Previous),
                KeyCode::Char('t') => Some(Action::CycleTarget),
                KeyCode::Char('w') => Some(Action::Save),
                KeyCode::Char('r') => Some(Action::Reload),
                KeyCode::Enter | KeyCode::Char(' ') => {
                    service.map(|service| Action::ToggleEnablement { service })
                }
                KeyCode::Char('s') => service.map(|service| Action::ToggleRunning { service }),
                KeyCode::Char('b') => service.map(|service| Action::SetStartMode {
                    service,
                    mode: StartMode::OnBoot,
                }),
                KeyCode::Char('m') => service.map(|service| Action::SetStartMode {
                    service,
                    mode: StartMode::Manually,
                }),
                KeyCode::Char('d') => service.map(|service| Action::ShowDetails { service }),
                KeyCode::Char('l') => service.map(|service| Action::ShowLogs { service }),
                _ => None,
            }
        }
    }
}

const NOT_TOGGLEABLE: &str =
    "This service cannot be enabled/disabled because its unit file is not loaded";

pub struct App<'a> {
    runner: &'a dyn CommandRunner,
    registry: Registry,
    targets: TargetSelector,
    table_state: TableState,
    popup: Option<Popup>,
    message: Option<String>,
    should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0)); // Start with first item selected

        Self {
            runner,
            registry: Registry::new(),
            targets: TargetSelector::default(),
            table_state,
            popup: None,
            message: None,
            should_quit: false,
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.refresh_services()?;

        while !self.should_quit {
            terminal.draw(|f| {
                ui::render(
                    f,
                    &self.registry,
                    &self.targets,
                    &mut self.table_state,
                    self.popup.as_ref(),
                    self.message.as_deref(),
                )
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let selected = self.selected_service();
                if let Some(action) = decode(key.code, self.popup.as_ref(), selected.as_deref()) {
                    self.apply(action)?;
                }
            }
        }

        Ok(())
    }

    /// Reads services and targets from the system, discarding staged changes.
    fn refresh_services(&mut self) -> Result<()> {
        loader::load(&mut self.registry, self.runner).context("Failed to read services")?;
        self.targets
            .reset(self.runner)
            .context("Failed to read systemd targets")?;

        if let Some(selected) = self.table_state.selected() {
            if selected >= self.registry.len() {
                self.table_state
                    .select(Some(self.registry.len().saturating_sub(1)));
            }
        }
        Ok(())
    }

    fn selected_service(&self) -> Option<String> {
        let index = self.table_state.selected()?;
        self.registry.records().nth(index).map(|r| r.name.clone())
    }

    pub fn apply(&mut self, action: Action) -> Result<()> {
        self.message = None;

        match action {
            Action::Next => self.next(),
            Action::Previous => self.previous(),
            Action::ToggleEnablement { service } => {
                info!("Toggling service status: {}", service);
                if !self.registry.toggle_enablement(&service) {
                    self.message = Some(NOT_TOGGLEABLE.to_string());
                }
            }
            Action::SetStartMode { service, mode } => {
                if !self.registry.set_start_mode(&service, mode) {
                    self.message = Some(NOT_TOGGLEABLE.to_string());
                }
            }
            Action::ToggleRunning { service } => {
                self.registry.toggle_activity(&service);
            }
            Action::ShowDetails { service } => {
                let text = self.registry.status(self.runner, &service);
                self.popup = Some(Popup::Details {
                    service,
                    text,
                    scroll: 0,
                });
            }
            Action::ShowLogs { service } => {
                let lines = self
                    .registry
                    .logs(self.runner, &service)
                    .lines()
                    .map(str::to_string)
                    .collect();
                self.popup = Some(Popup::Logs {
                    service,
                    lines,
                    scroll: 0,
                });
            }
            Action::CycleTarget => {
                if let Err(e) = self.targets.cycle_default() {
                    self.message = Some(e.to_string());
                }
            }
            Action::Save => self.save()?,
            Action::Reload => {
                self.refresh_services()?;
                self.message = Some("Changes discarded".to_string());
            }
            Action::Quit => {
                if self.registry.is_modified() || self.targets.is_modified() {
                    self.popup = Some(Popup::ConfirmQuit);
                } else {
                    self.should_quit = true;
                }
            }
            Action::ScrollDown => self.scroll_details(|s| s.saturating_add(1)),
            Action::ScrollUp => self.scroll_details(|s| s.saturating_sub(1)),
            Action::Confirm => {
                self.popup = None;
                self.should_quit = true;
            }
            Action::Dismiss => self.popup = None,
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        info!("Writing configuration...");
        let mut errors = Vec::new();

        if let Err(e) = self.targets.save(self.runner) {
            warn!("Could not set default target: {}", e);
            errors.push(e.to_string());
        }

        let outcome = self.registry.save(self.runner, SaveOptions::default());
        if !outcome.is_success() {
            errors.extend(self.registry.errors().iter().cloned());
            // Leave the failed entries visible but allow another attempt
            self.registry.reset();
        }

        if errors.is_empty() {
            self.refresh_services()?;
            self.message = Some("Configuration written".to_string());
        } else {
            self.popup = Some(Popup::Errors(errors));
        }
        Ok(())
    }

    fn scroll_details(&mut self, step: impl FnOnce(u16) -> u16) {
        match &mut self.popup {
            Some(Popup::Details { scroll, .. }) | Some(Popup::Logs { scroll, .. }) => {
                *scroll = step(*scroll);
            }
            _ => {}
        }
    }

    fn next(&mut self) {
        let i = match self.table_state.selected() {
            Some(i) => {
                if i >= self.registry.len().saturating_sub(1) {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous(&mut self) {
        let i = match self.table_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.registry.len().saturating_sub(1)
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{MockRunner, failure, success};

    fn runner() -> MockRunner {
        let runner = MockRunner::default();
        runner.respond(
            &["list-unit-files"],
            success("cups.service disabled\nsshd.service enabled\n"),
        );
        runner.respond(
            &["list-units", "--all", "--type=service"],
            success("cups.service loaded inactive dead CUPS\nsshd.service loaded active running sshd\n"),
        );
        runner.respond(
            &["list-units", "--all", "--type=target"],
            success("graphical.target loaded active active Graphical Interface\n"),
        );
        runner.respond(
            &["show", "--property=Id,AllowIsolate,Description"],
            success("Id=graphical.target\nAllowIsolate=yes\n"),
        );
        runner.respond(&["get-default"], success("graphical.target\n"));
        runner
    }

    #[test]
    fn test_decode_main_view() {
        assert_eq!(decode(KeyCode::Char('q'), None, None), Some(Action::Quit));
        assert_eq!(
            decode(KeyCode::Enter, None, Some("sshd")),
            Some(Action::ToggleEnablement {
                service: "sshd".to_string()
            })
        );
        assert_eq!(
            decode(KeyCode::Char('m'), None, Some("sshd")),
            Some(Action::SetStartMode {
                service: "sshd".to_string(),
                mode: StartMode::Manually
            })
        );
        assert_eq!(decode(KeyCode::Enter, None, None), None);
        assert_eq!(decode(KeyCode::Char('z'), None, Some("sshd")), None);
    }

    #[test]
    fn test_decode_popups() {
        let confirm = Popup::ConfirmQuit;
        assert_eq!(decode(KeyCode::Char('y'), Some(&confirm), None), Some(Action::Confirm));
        assert_eq!(decode(KeyCode::Char('n'), Some(&confirm), None), Some(Action::Dismiss));

        let details = Popup::Details {
            service: "sshd".to_string(),
            text: String::new(),
            scroll: 0,
        };
        assert_eq!(decode(KeyCode::Char('j'), Some(&details), None), Some(Action::ScrollDown));
        assert_eq!(decode(KeyCode::Esc, Some(&details), None), Some(Action::Dismiss));

        let logs = Popup::Logs {
            service: "sshd".to_string(),
            lines: Vec::new(),
            scroll: 0,
        };
        assert_eq!(decode(KeyCode::Char('k'), Some(&logs), None), Some(Action::ScrollUp));
        assert_eq!(decode(KeyCode::Char('l'), Some(&logs), None), Some(Action::Dismiss));
    }

    #[test]
    fn test_decode_show_logs() {
        assert_eq!(
            decode(KeyCode::Char('l'), None, Some("sshd")),
            Some(Action::ShowLogs {
                service: "sshd".to_string()
            })
        );
        assert_eq!(decode(KeyCode::Char('l'), None, None), None);
    }

    #[test]
    fn test_show_logs_reads_journal() {
        use systemd::Tool;

        let runner = runner();
        runner.respond(&["show", "--property=TriggeredBy"], success("cups.socket\n"));
        runner.respond_to(
            Tool::Journalctl,
            &["-b"],
            success("cupsd[7]: Scheduler started\ncupsd[7]: Listening\n"),
        );
        let mut app = App::new(&runner);
        app.refresh_services().unwrap();

        app.apply(Action::ShowLogs {
            service: "cups".to_string(),
        })
        .unwrap();
        app.apply(Action::ScrollDown).unwrap();

        assert_eq!(
            app.popup,
            Some(Popup::Logs {
                service: "cups".to_string(),
                lines: vec![
                    "cupsd[7]: Scheduler started".to_string(),
                    "cupsd[7]: Listening".to_string(),
                ],
                scroll: 1,
            })
        );
        assert_eq!(
            runner.calls_of(Tool::Journalctl),
            vec![vec!["-b", "--no-pager", "-u", "cups.service", "-u", "cups.socket"]]
        );
    }

    #[test]
    fn test_selection_follows_name_order() {
        let runner = runner();
        let mut app = App::new(&runner);
        app.refresh_services().unwrap();

        assert_eq!(app.selected_service().as_deref(), Some("cups"));
        app.apply(Action::Next).unwrap();
        assert_eq!(app.selected_service().as_deref(), Some("sshd"));
        app.apply(Action::Next).unwrap();
        assert_eq!(app.selected_service().as_deref(), Some("cups"));
        app.apply(Action::Previous).unwrap();
        assert_eq!(app.selected_service().as_deref(), Some("sshd"));
    }

    #[test]
    fn test_quit_with_pending_changes_asks() {
        let runner = runner();
        let mut app = App::new(&runner);
        app.refresh_services().unwrap();

        app.apply(Action::ToggleEnablement {
            service: "cups".to_string(),
        })
        .unwrap();
        app.apply(Action::Quit).unwrap();
        assert_eq!(app.popup, Some(Popup::ConfirmQuit));
        assert!(!app.should_quit);

        app.apply(Action::Confirm).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_failed_save_shows_errors_and_resets() {
        let runner = runner();
        runner.respond(&["enable", "cups.service"], failure("denied"));
        let mut app = App::new(&runner);
        app.refresh_services().unwrap();

        app.apply(Action::ToggleEnablement {
            service: "cups".to_string(),
        })
        .unwrap();
        app.apply(Action::Save).unwrap();

        match &app.popup {
            Some(Popup::Errors(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("Could not enable cups; "));
            }
            other => panic!("expected errors popup, got {:?}", other),
        }
        assert!(app.registry.errors().is_empty());
        assert!(!app.registry.is_modified());
    }

    #[test]
    fn test_show_details_queries_status() {
        let runner = runner();
        runner.respond(&["status", "sshd.service"], success("sshd.service - OpenSSH\n"));
        let mut app = App::new(&runner);
        app.refresh_services().unwrap();

        app.apply(Action::ShowDetails {
            service: "sshd".to_string(),
        })
        .unwrap();
        app.apply(Action::ScrollDown).unwrap();

        assert_eq!(
            app.popup,
            Some(Popup::Details {
                service: "sshd".to_string(),
                text: "sshd.service - OpenSSH\n".to_string(),
                scroll: 1,
            })
        );
    }
}
