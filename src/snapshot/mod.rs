//! Snapshot persistence: fetched content lands under
//! `<root>/<component>/<address>/<sanitized-filename>` with restrictive
//! permissions, either as a plain tree or inside a git-backed store.

pub mod git;

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::{AddressMap, FileMap};
use crate::fetch::{Fetched, Fetcher};
use crate::redact;
use crate::status::{Status, charm_versions};

/// Flatten an absolute remote path into a snapshot file name:
/// `/etc/contrail/contrail-api.conf` -> `_etc_contrail_contrail-api.conf`.
pub fn sanitize_file_name(remote_path: &str) -> String {
    remote_path.replace('/', "_")
}

/// Write `contents` at `path` with 0o600 permissions, through a temporary
/// sibling and a rename so an interrupt never leaves a half-written file.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid destination path: {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    let mut file = fs::File::create(&tmp)
        .with_context(|| format!("Failed to create {}", tmp.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

/// Make sure `root` exists and is empty, asking through `confirm` before
/// deleting a previous snapshot. Returns false when the user declines.
pub fn prepare_dir(root: &Path, confirm: &dyn Fn(&str) -> Result<bool>) -> Result<bool> {
    if root.exists() {
        let prompt = format!(
            "output directory '{}' already exists, old files will be deleted, proceed?",
            root.display()
        );
        if !confirm(&prompt)? {
            return Ok(false);
        }
        fs::remove_dir_all(root)
            .with_context(|| format!("Failed to delete {}", root.display()))?;
    }
    fs::create_dir_all(root).with_context(|| format!("Failed to create {}", root.display()))?;
    Ok(true)
}

/// Record the deployed charm-version table alongside the captured configs
/// so every snapshot says what was running when it was taken.
pub fn write_versions(root: &Path, status: &Status) -> Result<()> {
    write_file(&root.join("juju_apps.txt"), charm_versions(status).as_bytes())
}

/// Capture every configured file from every component host under `root`.
/// Fetches run one host at a time, one file at a time; each file is
/// complete on disk before the next starts.
pub async fn write_snapshot<F: Fetcher>(
    root: &Path,
    addresses: &AddressMap,
    files: &FileMap,
    username: &str,
    include_passwords: bool,
    fetcher: &F,
) -> Result<()> {
    for (component, hosts) in addresses {
        info!(component = %component, "getting component data");
        // Presence is validated at config load; stay resilient anyway.
        let Some(paths) = files.get(component) else {
            continue;
        };
        for address in hosts {
            scrape_host(root, component, address, paths, username, include_passwords, fetcher)
                .await?;
        }
    }
    Ok(())
}

/// Grab every configured file from one host. A timeout on any file skips
/// the rest of this host's files; sibling hosts and components continue.
async fn scrape_host<F: Fetcher>(
    root: &Path,
    component: &str,
    address: &str,
    paths: &[String],
    username: &str,
    include_passwords: bool,
    fetcher: &F,
) -> Result<()> {
    info!(address, "fetching");
    for remote_path in paths {
        let contents = match fetcher.fetch(address, remote_path, username).await? {
            Fetched::HostUnreachable => return Ok(()),
            Fetched::Absent => String::new(),
            Fetched::Content(text) => text,
        };
        let contents = if include_passwords {
            contents
        } else {
            redact::scrub_passwords(&contents)
        };
        if let Err(err) = store_file(root, component, address, remote_path, &contents) {
            // Fatal for this file only; siblings still get captured.
            error!(
                component,
                address,
                path = %remote_path,
                "failed to write snapshot file: {err:#}"
            );
        }
    }
    Ok(())
}

fn store_file(
    root: &Path,
    component: &str,
    address: &str,
    remote_path: &str,
    contents: &str,
) -> Result<()> {
    let component_dir = root.join(component);
    let host_dir = component_dir.join(address);
    fs::create_dir_all(&host_dir)
        .with_context(|| format!("Failed to create {}", host_dir.display()))?;
    for dir in [&component_dir, &host_dir] {
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;
    }
    write_file(&host_dir.join(sanitize_file_name(remote_path)), contents.as_bytes())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            sanitize_file_name("/etc/contrail/contrail-api.conf"),
            "_etc_contrail_contrail-api.conf"
        );
        assert_eq!(sanitize_file_name("plain.conf"), "plain.conf");
    }

    #[test]
    fn test_write_file_sets_permissions_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        write_file(&path, b"key = value\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"key = value\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_write_file_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        write_file(&path, b"old\n").unwrap();
        write_file(&path, b"new\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new\n");
    }

    #[test]
    fn test_prepare_dir_creates_missing_root_without_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("snap");
        let proceeded = prepare_dir(&root, &|_| panic!("should not prompt")).unwrap();
        assert!(proceeded);
        assert!(root.is_dir());
    }

    #[test]
    fn test_prepare_dir_decline_keeps_old_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("snap");
        fs::create_dir_all(root.join("app")).unwrap();
        let proceeded = prepare_dir(&root, &|_| Ok(false)).unwrap();
        assert!(!proceeded);
        assert!(root.join("app").exists());
    }

    #[test]
    fn test_prepare_dir_accept_wipes_old_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("snap");
        fs::create_dir_all(root.join("app")).unwrap();
        let proceeded = prepare_dir(&root, &|_| Ok(true)).unwrap();
        assert!(proceeded);
        assert!(root.is_dir());
        assert!(!root.join("app").exists());
    }

    #[test]
    fn test_store_file_builds_component_address_layout() {
        let dir = tempfile::tempdir().unwrap();
        store_file(
            dir.path(),
            "contrail-controller",
            "10.0.0.1",
            "/etc/contrail/contrail-api.conf",
            "key = value\n",
        )
        .unwrap();
        let component_dir = dir.path().join("contrail-controller");
        let host_dir = component_dir.join("10.0.0.1");
        for created in [&component_dir, &host_dir] {
            let mode = fs::metadata(created).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700, "{}", created.display());
        }
        let stored = host_dir.join("_etc_contrail_contrail-api.conf");
        assert_eq!(fs::read_to_string(stored).unwrap(), "key = value\n");
    }

    #[test]
    fn test_write_versions_records_deployed_charms() {
        let dir = tempfile::tempdir().unwrap();
        let status: Status = serde_json::from_str(
            r#"{
                "applications": {
                    "heat": {
                        "charm": "cs:heat-7",
                        "units": {
                            "heat/0": {
                                "public-address": "10.0.0.4",
                                "workload-version": "11.0"
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        write_versions(dir.path(), &status).unwrap();
        let table = fs::read_to_string(dir.path().join("juju_apps.txt")).unwrap();
        assert!(table.starts_with("# application"));
        assert!(table.contains("heat/0"));
        assert!(table.contains("11.0"));
    }

    struct ScriptedFetcher {
        unreachable: &'static str,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, address: &str, path: &str, _username: &str) -> Result<Fetched> {
            self.calls.lock().unwrap().push(format!("{address} {path}"));
            if address == self.unreachable {
                return Ok(Fetched::HostUnreachable);
            }
            Ok(Fetched::Content(format!("captured from {address}\n")))
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_skips_its_remaining_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut addresses = AddressMap::new();
        addresses
            .entry("contrail-controller".to_string())
            .or_default()
            .extend(["10.0.0.5".to_string(), "10.0.0.6".to_string()]);
        let mut files = FileMap::new();
        files.insert(
            "contrail-controller".to_string(),
            vec![
                "/etc/a.conf".to_string(),
                "/etc/b.conf".to_string(),
                "/etc/c.conf".to_string(),
            ],
        );
        let fetcher = ScriptedFetcher {
            unreachable: "10.0.0.5",
            calls: Mutex::new(Vec::new()),
        };

        write_snapshot(dir.path(), &addresses, &files, "ubuntu", true, &fetcher)
            .await
            .unwrap();

        let calls = fetcher.calls.lock().unwrap();
        // Only the first file was attempted on the dead host.
        assert_eq!(
            calls.iter().filter(|c| c.starts_with("10.0.0.5")).count(),
            1
        );
        // The sibling host still got all three files.
        assert_eq!(
            calls.iter().filter(|c| c.starts_with("10.0.0.6")).count(),
            3
        );
        assert!(!dir.path().join("contrail-controller/10.0.0.5").exists());
        let good = dir.path().join("contrail-controller/10.0.0.6");
        assert_eq!(fs::read_dir(&good).unwrap().count(), 3);
        assert_eq!(
            fs::read_to_string(good.join("_etc_a.conf")).unwrap(),
            "captured from 10.0.0.6\n"
        );
    }
}
