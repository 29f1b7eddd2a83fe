use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "services-manager")]
#[command(version, about = "Configure systemd services and the default boot target")]
pub struct Cli {
    /// Manage the per-user service manager instead of the system one
    #[arg(long, global = true, env = "SERVICES_MANAGER_USER")]
    pub user: bool,

    /// systemctl binary to run
    #[arg(
        long,
        global = true,
        env = "SERVICES_MANAGER_SYSTEMCTL",
        default_value = "systemctl"
    )]
    pub systemctl: PathBuf,

    /// journalctl binary to run for service logs
    #[arg(
        long,
        global = true,
        env = "SERVICES_MANAGER_JOURNALCTL",
        default_value = "journalctl"
    )]
    pub journalctl: PathBuf,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write log output to a file (required to see logs in the interactive view)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive services manager (default)
    Tui,

    /// List services with their start mode and run state
    List,

    /// Show the full status of a service
    Status {
        /// Service name (e.g., "sshd" or "sshd.service")
        name: String,
    },

    /// Write the names of all enabled services as a profile
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Enable exactly the services in a profile and disable the rest
    Import {
        /// Profile written by `export`
        file: PathBuf,

        /// Write every service, not only the changed ones
        #[arg(long)]
        force: bool,

        /// Do not start or stop services, only change enablement
        #[arg(long)]
        no_switch: bool,
    },

    /// Change a single service and commit it
    Set {
        /// Service name
        name: String,

        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        #[arg(long)]
        disable: bool,

        #[arg(long, conflicts_with = "stop")]
        start: bool,

        #[arg(long)]
        stop: bool,

        /// Do not start or stop the service, only change enablement
        #[arg(long)]
        no_switch: bool,
    },

    /// Show or set the default boot target
    DefaultTarget {
        /// New default target (e.g., "multi-user")
        name: Option<String>,
    },
}
