// Error types for the services manager

use thiserror::Error;

/// Errors raised while talking to systemctl or handling profiles
#[derive(Error, Debug)]
pub enum Error {
    /// systemctl could not be spawned at all
    #[error("failed to execute systemctl {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// systemctl ran but reported failure
    #[error("systemctl {command} exited with status {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// A listing line did not have the expected token shape
    #[error("malformed line in systemctl {command} output: {line:?}")]
    MalformedLine { command: String, line: String },

    /// An import was requested with no services at all
    #[error("no services given for import")]
    EmptyImport,

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("invalid profile: {0}")]
    Profile(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts a load of the service listings
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Error::Spawn { .. } | Error::CommandFailed { .. } | Error::MalformedLine { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
