mod app;
mod cli;
mod commands;
mod error;

use anyhow::{Context, Result};
use app::systemd::HostRunner;
use clap::Parser;
use cli::{Cli, Command};
use std::fs::File;

fn init_logging(cli: &Cli, interactive: bool) -> Result<()> {
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);

    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // stderr belongs to the terminal UI
        None if interactive => {
            builder.filter_level(log::LevelFilter::Off);
        }
        None => {}
    }

    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Command::Tui);
    init_logging(&cli, matches!(command, Command::Tui))?;

    let runner = HostRunner::new(&cli.systemctl, &cli.journalctl, cli.user);

    match command {
        Command::Tui => {
            let mut terminal = ratatui::init();
            let result = app::App::new(&runner).run(&mut terminal);
            ratatui::restore();
            result
        }
        Command::List => commands::list(&runner),
        Command::Status { name } => commands::status(&runner, &name),
        Command::Export { output } => commands::export(&runner, output.as_deref()),
        Command::Import {
            file,
            force,
            no_switch,
        } => commands::import(&runner, &file, force, !no_switch),
        Command::Set {
            name,
            enable,
            disable,
            start,
            stop,
            no_switch,
        } => commands::set(
            &runner,
            &name,
            commands::Change {
                enable: enable.then_some(true).or(disable.then_some(false)),
                active: start.then_some(true).or(stop.then_some(false)),
            },
            !no_switch,
        ),
        Command::DefaultTarget { name } => commands::default_target(&runner, name.as_deref()),
    }
}
