//! Git-backed snapshot store: one repository per tracked fleet, one commit
//! per capture run.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use git2::{IndexAddOption, Repository, Signature};
use tracing::{info, warn};

/// Open the snapshot repository at `root`, initializing it on first use.
pub fn ensure_repo(root: &Path) -> Result<Repository> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create {}", root.display()))?;
    if root.join(".git").exists() {
        Repository::open(root)
            .with_context(|| format!("Failed to open git repository at {}", root.display()))
    } else {
        info!(root = %root.display(), "initializing snapshot repository");
        Repository::init(root)
            .with_context(|| format!("Failed to init git repository at {}", root.display()))
    }
}

/// Stage the whole tree and record one commit for this run. Best-effort:
/// a failure here is logged and the capture still counts.
pub fn commit_all(repo: &Repository) {
    match try_commit(repo) {
        Ok(Some(oid)) => info!(commit = %oid, "recorded snapshot commit"),
        Ok(None) => info!("no config changes since last capture, nothing to commit"),
        Err(err) => warn!("snapshot commit failed: {err:#}"),
    }
}

fn try_commit(repo: &Repository) -> Result<Option<git2::Oid>> {
    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now("confdiff", "confdiff@localhost")?;
    let message = format!("automated capture {}", Utc::now().to_rfc3339());
    match repo.head().ok().and_then(|head| head.target()) {
        Some(head_oid) => {
            let parent = repo.find_commit(head_oid)?;
            if parent.tree_id() == tree_id {
                return Ok(None);
            }
            let oid = repo.commit(
                Some("HEAD"),
                &signature,
                &signature,
                &message,
                &tree,
                &[&parent],
            )?;
            Ok(Some(oid))
        }
        None => {
            let oid = repo.commit(Some("HEAD"), &signature, &signature, &message, &tree, &[])?;
            Ok(Some(oid))
        }
    }
}
