// Defines the core data structures for the application.

/// Suffix systemd appends to service unit names.
pub const SERVICE_SUFFIX: &str = ".service";

/// Staged and observed state of one systemd service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String, // without the ".service" suffix
    pub enabled: bool,
    pub active: bool,
    pub loaded: bool,
    pub description: String,
    pub modified: bool,
}

impl ServiceRecord {
    /// A record as first seen in the enablement listing.
    pub fn new(name: &str, enabled: bool) -> Self {
        Self {
            name: name.to_string(),
            enabled,
            active: false,
            loaded: false,
            description: String::new(),
            modified: false,
        }
    }

    pub fn start_mode(&self) -> StartMode {
        if self.enabled {
            StartMode::OnBoot
        } else {
            StartMode::Manually
        }
    }
}

/// Re-appends the unit suffix to a stored service name.
pub fn unit_name(service: &str) -> String {
    format!("{}{}", service, SERVICE_SUFFIX)
}

/// Accepts both "sshd" and "sshd.service".
pub fn service_name(unit: &str) -> &str {
    unit.strip_suffix(SERVICE_SUFFIX).unwrap_or(unit)
}

/// How a service gets started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    OnBoot,
    Manually,
}

impl StartMode {
    pub fn label(&self) -> &'static str {
        match self {
            StartMode::OnBoot => "On Boot",
            StartMode::Manually => "Manually",
        }
    }
}
