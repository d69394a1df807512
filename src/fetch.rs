//! Remote file retrieval over SSH.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

/// How long a remote invocation may take before the host counts as down.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(20);

/// Outcome of one remote file grab.
#[derive(Debug, PartialEq, Eq)]
pub enum Fetched {
    /// File contents as reported by the remote host.
    Content(String),
    /// The remote path does not exist; recorded as empty content.
    Absent,
    /// The host did not answer within the timeout. The caller skips the
    /// rest of this host's files; sibling hosts are unaffected.
    HostUnreachable,
}

/// Transport seam for remote reads, so capture logic can be exercised
/// without live hosts.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, address: &str, path: &str, username: &str) -> Result<Fetched>;
}

/// Production transport: one SSH invocation per file.
pub struct SshFetcher;

#[async_trait]
impl Fetcher for SshFetcher {
    async fn fetch(&self, address: &str, path: &str, username: &str) -> Result<Fetched> {
        fetch_remote_file(address, path, username).await
    }
}

/// Grab the text contents of a file on a remote host.
///
/// Most fleet config files are root-only, so the read goes through
/// `sudo cat`. Any non-zero exit other than a missing file is fatal for
/// the run.
pub async fn fetch_remote_file(address: &str, path: &str, username: &str) -> Result<Fetched> {
    let mut cmd = Command::new("ssh");
    cmd.arg("-o")
        .arg("StrictHostKeyChecking=no")
        .arg(format!("{username}@{address}"))
        .arg("sudo")
        .arg("cat")
        .arg(path)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    let output = match tokio::time::timeout(REMOTE_TIMEOUT, cmd.output()).await {
        Ok(result) => {
            result.with_context(|| format!("Failed to run ssh for {username}@{address}"))?
        }
        Err(_) => {
            info!(address, path, "no answer from host, skipping");
            return Ok(Fetched::HostUnreachable);
        }
    };
    classify(address, path, username, &output)
}

fn classify(
    address: &str,
    path: &str,
    username: &str,
    output: &std::process::Output,
) -> Result<Fetched> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such file or directory") {
            return Ok(Fetched::Absent);
        }
        bail!(
            "ssh {username}@{address} 'sudo cat {path}' failed: {}",
            stderr.trim()
        );
    }
    Ok(Fetched::Content(
        String::from_utf8_lossy(&output.stdout).into_owned(),
    ))
}
