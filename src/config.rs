//! YAML run configuration: the component address map and the per-component
//! remote file lists.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, ensure};

/// Component name -> ordered set of reachable host addresses. BTree
/// containers keep iteration and serialized output deterministic, and the
/// set absorbs the duplicates a subordinate component produces when it sits
/// on every unit of its parent.
pub type AddressMap = BTreeMap<String, BTreeSet<String>>;

/// Component name -> absolute remote config file paths to capture.
pub type FileMap = BTreeMap<String, Vec<String>>;

/// Load both YAML inputs and check they agree on components. Runs before
/// any remote I/O, so a bad config never leaves a partial snapshot.
pub fn load(addresses_file: &Path, files_file: &Path) -> Result<(AddressMap, FileMap)> {
    let addresses: AddressMap = read_yaml(addresses_file)?;
    let files: FileMap = read_yaml(files_file)?;
    for component in addresses.keys() {
        ensure!(
            files.contains_key(component),
            "No file list configured for component '{}' (listed in {})",
            component,
            addresses_file.display()
        );
    }
    Ok((addresses, files))
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML in {}", path.display()))
}

/// Serialize the address map as YAML at `path` so later runs can reuse it
/// without querying the orchestrator.
pub fn write_address_map(path: &Path, map: &AddressMap) -> Result<()> {
    let yaml = serde_yaml::to_string(map)
        .with_context(|| format!("Failed to serialize address map for {}", path.display()))?;
    crate::snapshot::write_file(path, yaml.as_bytes())
}
