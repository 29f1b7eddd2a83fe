// Populates the registry from systemctl listings.

use super::model::{SERVICE_SUFFIX, ServiceRecord};
use super::registry::Registry;
use super::systemd::{self, CommandRunner};
use crate::error::{Error, Result};
use log::{debug, info};
use std::collections::BTreeMap;

const LOADED: &str = "loaded";
const ACTIVE: &str = "active";
const ENABLED: &str = "enabled";
const DISABLED: &str = "disabled";

fn malformed(command: &str, line: &str) -> Error {
    Error::MalformedLine {
        command: command.to_string(),
        line: line.to_string(),
    }
}

fn service_name<'a>(command: &str, line: &str, unit: &'a str) -> Result<&'a str> {
    unit.strip_suffix(SERVICE_SUFFIX)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed(command, line))
}

/// Parses `list-unit-files` output. Only enabled/disabled units produce
/// records; static, masked and friends are out of scope.
pub fn parse_unit_files(stdout: &str) -> Result<BTreeMap<String, ServiceRecord>> {
    let mut services = BTreeMap::new();

    for line in stdout.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 2 {
            return Err(malformed("list-unit-files", line));
        }

        let name = service_name("list-unit-files", line, parts[0])?;
        let enabled = match parts[1] {
            ENABLED => true,
            DISABLED => false,
            _ => continue,
        };
        services.insert(name.to_string(), ServiceRecord::new(name, enabled));
    }

    Ok(services)
}

/// Merges `list-units` details into records already known from the
/// enablement listing. Units without an enablement line are ignored.
pub fn merge_unit_details(
    services: &mut BTreeMap<String, ServiceRecord>,
    stdout: &str,
) -> Result<()> {
    for line in stdout.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 4 {
            return Err(malformed("list-units", line));
        }

        let name = service_name("list-units", line, parts[0])?;
        if let Some(record) = services.get_mut(name) {
            record.loaded = parts[1] == LOADED;
            record.active = parts[2] == ACTIVE;
            record.description = parts[4..].join(" ");
        }
    }

    Ok(())
}

/// Reads all services' data into the registry. On failure the registry
/// keeps its previous snapshot.
pub fn load(registry: &mut Registry, runner: &dyn CommandRunner) -> Result<()> {
    let mut services = parse_unit_files(&systemd::list_unit_files(runner)?)?;
    info!("Services loaded: {}", services.len());

    merge_unit_details(&mut services, &systemd::list_units(runner)?)?;
    debug!("Services details loaded: {:?}", services);

    registry.replace(services);
    Ok(())
}
