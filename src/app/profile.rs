// Enablement profiles: the set of services that should be enabled.

use super::registry::Registry;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Services to enable; every other service gets disabled on import
    pub services: Vec<String>,
}

impl Profile {
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            services: registry.export(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()? + "\n")?;
        Ok(())
    }
}
