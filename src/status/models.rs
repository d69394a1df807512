//! Typed model of `juju status --format=json`, narrowed to the fields this
//! tool reads. Every field defaults, so a sparse or unexpected entry is
//! skipped at the parse boundary instead of failing the whole status.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub applications: BTreeMap<String, Application>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub charm: String,
    /// Parent applications when this one is a subordinate deployed on top
    /// of another charm's units.
    #[serde(default, rename = "subordinate-to")]
    pub subordinate_to: Vec<String>,
    #[serde(default)]
    pub units: BTreeMap<String, Unit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Unit {
    #[serde(default, rename = "public-address")]
    pub public_address: Option<String>,
    #[serde(default, rename = "workload-version")]
    pub workload_version: Option<String>,
}
