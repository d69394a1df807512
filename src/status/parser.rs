//! Turn orchestrator status output (plain text or structured JSON) into the
//! component address map.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::models::{Application, Status};
use crate::config::AddressMap;

/// Component prefixes recognized in plain-text status output, with the
/// whitespace-separated column holding the unit address. `neutron-api`
/// units are stored under the shorter `neutron` name.
const TEXT_COMPONENTS: &[(&str, &str, usize)] = &[
    ("contrail-controller/", "contrail-controller", 4),
    ("contrail-analyticsdb/", "contrail-analyticsdb", 4),
    ("contrail-analytics/", "contrail-analytics", 4),
    ("contrail-haproxy/", "contrail-haproxy", 4),
    ("heat/", "heat", 4),
    ("neutron-api/", "neutron", 4),
];

lazy_static! {
    static ref CHARM_SEPARATORS: Regex = Regex::new(r"[:/]").unwrap();
}

/// Extract component addresses from saved plain-text status output.
/// Unknown lines are ignored, never an error. Subordinate `contrail-agent`
/// units appear indented under their parent and carry the address one
/// column earlier.
pub fn parse_status_text(status: &str) -> AddressMap {
    let mut map = AddressMap::new();
    for line in status.lines() {
        if line.starts_with("  contrail-agent") && line.contains('/') {
            if let Some(address) = line.split_whitespace().nth(3) {
                map.entry("contrail-agent".to_string())
                    .or_default()
                    .insert(address.to_string());
            }
            continue;
        }
        for (prefix, component, column) in TEXT_COMPONENTS {
            if line.starts_with(prefix) {
                if let Some(address) = line.split_whitespace().nth(*column) {
                    map.entry((*component).to_string())
                        .or_default()
                        .insert(address.to_string());
                }
                break;
            }
        }
    }
    map
}

/// Canonical application name derived from a charm id: the last `:`/`/`
/// segment, with its trailing revision dropped. For example
/// `cs:~juju-charmers/contrail-controller-42` -> `contrail-controller`.
pub fn canonical_app_name(charm: &str) -> String {
    let last = CHARM_SEPARATORS.split(charm).last().unwrap_or("");
    let parts: Vec<&str> = last.split('-').collect();
    parts[..parts.len().saturating_sub(1)].join("-")
}

/// Build the address map from structured status. A subordinate's addresses
/// come from each parent's units but are grouped under the subordinate's
/// own canonical name; a subordinate present on every parent unit collapses
/// into the address set.
pub fn parse_status(status: &Status) -> AddressMap {
    let mut map = AddressMap::new();
    for (app_name, app) in &status.applications {
        if !app_name.contains("contrail") {
            continue;
        }
        let component = canonical_app_name(&app.charm);
        if app.subordinate_to.is_empty() {
            collect_units(&mut map, &component, app);
            continue;
        }
        for parent_name in &app.subordinate_to {
            match status.applications.get(parent_name) {
                Some(parent) => collect_units(&mut map, &component, parent),
                None => warn!(
                    application = %app_name,
                    parent = %parent_name,
                    "subordinate parent missing from status, skipping"
                ),
            }
        }
    }
    map
}

fn collect_units(map: &mut AddressMap, component: &str, app: &Application) {
    for unit in app.units.values() {
        if let Some(address) = &unit.public_address {
            map.entry(component.to_string())
                .or_default()
                .insert(address.clone());
        }
    }
}

/// Fixed-width table of every application, charm, unit, and workload
/// version, written into the snapshot so a capture also records what was
/// deployed.
pub fn charm_versions(status: &Status) -> String {
    let mut rows = vec![format!(
        "{:25} {:50} {:30} {:10}",
        "# application", "charm", "unit", "software version"
    )];
    for (app_name, app) in &status.applications {
        for (unit_name, unit) in &app.units {
            rows.push(format!(
                "{:25} {:50} {:30} {:10}",
                app_name,
                app.charm,
                unit_name,
                unit.workload_version.as_deref().unwrap_or("")
            ));
        }
    }
    rows.join("\n") + "\n"
}
