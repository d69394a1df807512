//! Cluster status capture and resolution into the component address map.

mod models;
mod parser;

pub use models::Status;
pub use parser::{charm_versions, parse_status, parse_status_text};

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;

use crate::fetch::REMOTE_TIMEOUT;

/// Query the current model for its structured status.
pub async fn live_status() -> Result<Status> {
    let mut cmd = Command::new("juju");
    cmd.args(["status", "--format=json"])
        .stdin(Stdio::null())
        .kill_on_drop(true);
    let output = tokio::time::timeout(REMOTE_TIMEOUT, cmd.output())
        .await
        .context("'juju status' did not answer within the timeout")?
        .context("Failed to run 'juju status'")?;
    if !output.status.success() {
        bail!(
            "'juju status' failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    serde_json::from_slice(&output.stdout)
        .context("Failed to parse 'juju status --format=json' output")
}
