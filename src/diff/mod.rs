//! Recursive snapshot-tree comparison.
//!
//! Two snapshot roots are walked level by level; identical relative paths
//! denote the same logical file across time. The report order is fixed at
//! every level (changed files, then left-only names, then right-only names,
//! then subdirectories, all in lexicographic entry order), so repeated runs
//! over unchanged trees produce byte-identical output.

pub mod myers;
pub mod render;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use termcolor::WriteColor;
use tracing::warn;

pub use render::DiffMode;

const SEPARATOR_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
}

/// Compare two snapshot roots and render every difference to `sink`.
///
/// A missing root is not an error: the report notes there is nothing to
/// compare and no file access happens. Symlinks are followed and compared
/// as regular files.
pub fn diff_trees(
    old: &Path,
    new: &Path,
    mode: DiffMode,
    sink: &mut dyn WriteColor,
) -> Result<()> {
    if !old.exists() || !new.exists() {
        writeln!(
            sink,
            "missing directory: '{}' or '{}'",
            old.display(),
            new.display()
        )?;
        writeln!(sink, "nothing to compare")?;
        return Ok(());
    }
    diff_level(old, new, mode, sink)
}

fn diff_level(old: &Path, new: &Path, mode: DiffMode, sink: &mut dyn WriteColor) -> Result<()> {
    let old_entries = match list_entries(old) {
        Ok(entries) => entries,
        Err(err) => return skip_subtree(old, &err, sink),
    };
    let new_entries = match list_entries(new) {
        Ok(entries) => entries,
        Err(err) => return skip_subtree(new, &err, sink),
    };

    let mut common_files = Vec::new();
    let mut common_dirs = Vec::new();
    let mut mismatched = Vec::new();
    let mut left_only = Vec::new();
    for (name, old_kind) in &old_entries {
        match new_entries.get(name) {
            None => left_only.push(name.clone()),
            Some(new_kind) => match (old_kind, new_kind) {
                (EntryKind::File, EntryKind::File) => common_files.push(name.clone()),
                (EntryKind::Dir, EntryKind::Dir) => common_dirs.push(name.clone()),
                _ => mismatched.push(name.clone()),
            },
        }
    }
    let right_only: Vec<String> = new_entries
        .keys()
        .filter(|name| !old_entries.contains_key(*name))
        .cloned()
        .collect();

    for name in &common_files {
        compare_file(&old.join(name), &new.join(name), mode, sink)?;
    }
    for name in &mismatched {
        separator(sink)?;
        writeln!(
            sink,
            "{}\n{}",
            old.join(name).display(),
            new.join(name).display()
        )?;
        writeln!(sink, "Entry type differs (file vs directory)")?;
        writeln!(sink)?;
    }
    if !left_only.is_empty() {
        separator(sink)?;
        writeln!(sink, "Files missing in the '{}' directory: ", new.display())?;
        writeln!(sink, "{}", left_only.join("\n"))?;
    }
    if !right_only.is_empty() {
        separator(sink)?;
        writeln!(sink, "Files missing in the '{}' directory: ", old.display())?;
        writeln!(sink, "{}", right_only.join("\n"))?;
    }
    for name in &common_dirs {
        diff_level(&old.join(name), &new.join(name), mode, sink)?;
    }
    Ok(())
}

/// Byte-compare one file pair; render a line diff when the contents differ.
/// An unreadable file is reported in place and never aborts the walk.
fn compare_file(old: &Path, new: &Path, mode: DiffMode, sink: &mut dyn WriteColor) -> Result<()> {
    let (old_bytes, new_bytes) = match (fs::read(old), fs::read(new)) {
        (Ok(o), Ok(n)) => (o, n),
        (Err(err), _) => return report_unreadable(old, new, &err, sink),
        (_, Err(err)) => return report_unreadable(old, new, &err, sink),
    };
    if old_bytes == new_bytes {
        return Ok(());
    }
    separator(sink)?;
    writeln!(sink, "{}\n{}", old.display(), new.display())?;
    match (String::from_utf8(old_bytes), String::from_utf8(new_bytes)) {
        (Ok(old_text), Ok(new_text)) => {
            render::render_diff(&old_text, &new_text, mode, sink)?;
        }
        _ => writeln!(sink, "Binary files differ")?,
    }
    writeln!(sink)?;
    Ok(())
}

fn list_entries(dir: &Path) -> std::io::Result<BTreeMap<String, EntryKind>> {
    let mut entries = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let kind = if entry.path().is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        entries.insert(name, kind);
    }
    Ok(entries)
}

fn separator(sink: &mut dyn WriteColor) -> Result<()> {
    writeln!(sink, "{}", "=".repeat(SEPARATOR_WIDTH))?;
    Ok(())
}

fn skip_subtree(dir: &Path, err: &std::io::Error, sink: &mut dyn WriteColor) -> Result<()> {
    warn!(directory = %dir.display(), "cannot list directory: {err}");
    separator(sink)?;
    writeln!(sink, "Skipping subtree '{}': {err}", dir.display())?;
    Ok(())
}

fn report_unreadable(
    old: &Path,
    new: &Path,
    err: &std::io::Error,
    sink: &mut dyn WriteColor,
) -> Result<()> {
    warn!(old = %old.display(), new = %new.display(), "cannot read file: {err}");
    separator(sink)?;
    writeln!(sink, "{}\n{}", old.display(), new.display())?;
    writeln!(sink, "Cannot compare (unreadable: {err})")?;
    writeln!(sink)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use termcolor::NoColor;

    fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
        for (rel, contents) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    fn run_diff(old: &Path, new: &Path, mode: DiffMode) -> String {
        let mut sink = NoColor::new(Vec::new());
        diff_trees(old, new, mode, &mut sink).unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_identical_trees_report_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        let files: &[(&str, &[u8])] = &[
            ("app/10.0.0.1/etc_app.conf", b"a\nb\n"),
            ("db/10.0.0.2/etc_db.conf", b"x\n"),
        ];
        write_tree(&old, files);
        write_tree(&new, files);
        assert_eq!(run_diff(&old, &new, DiffMode::Normal), "");
    }

    #[test]
    fn test_changed_file_emits_hunk_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        write_tree(&old, &[("app/10.0.0.1/app.conf", b"a\nb\nc\n")]);
        write_tree(&new, &[("app/10.0.0.1/app.conf", b"a\nx\nc\n")]);
        let out = run_diff(&old, &new, DiffMode::Unified);
        assert!(out.contains("app.conf"));
        assert!(out.contains("@@ -1,3 +1,3 @@"));
        assert!(out.contains("-b\n+x\n"));
        assert!(out.contains(" a\n"));
        assert!(out.contains(" c\n"));
    }

    #[test]
    fn test_added_file_listed_once_as_right_only() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        write_tree(&old, &[("app/10.0.0.1/base.conf", b"a\n")]);
        write_tree(
            &new,
            &[
                ("app/10.0.0.1/base.conf", b"a\n"),
                ("app/10.0.0.1/extra.conf", b"b\n"),
            ],
        );
        let out = run_diff(&old, &new, DiffMode::Normal);
        assert_eq!(out.matches("extra.conf").count(), 1);
        assert!(out.contains(&format!(
            "Files missing in the '{}' directory: \nextra.conf",
            old.join("app/10.0.0.1").display()
        )));
    }

    #[test]
    fn test_removed_file_listed_as_left_only() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        write_tree(&old, &[("app/gone.conf", b"a\n")]);
        write_tree(&new, &[("app/kept.conf", b"a\n")]);
        let out = run_diff(&old, &new, DiffMode::Normal);
        assert!(out.contains(&format!(
            "Files missing in the '{}' directory: \ngone.conf",
            new.join("app").display()
        )));
        assert!(out.contains(&format!(
            "Files missing in the '{}' directory: \nkept.conf",
            old.join("app").display()
        )));
    }

    #[test]
    fn test_missing_root_reports_nothing_to_compare() {
        let dir = tempfile::tempdir().unwrap();
        let new = dir.path().join("new");
        write_tree(&new, &[("app/a.conf", b"a\n")]);
        let out = run_diff(&PathBuf::from(dir.path().join("absent")), &new, DiffMode::Normal);
        assert!(out.contains("nothing to compare"));
        assert!(!out.contains("a.conf"));
    }

    #[test]
    fn test_binary_content_is_not_line_diffed() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        write_tree(&old, &[("app/blob", &[0xff, 0xfe, 0x00, 0x01][..])]);
        write_tree(&new, &[("app/blob", &[0xff, 0xfe, 0x00, 0x02][..])]);
        let out = run_diff(&old, &new, DiffMode::Unified);
        assert!(out.contains("Binary files differ"));
        assert!(!out.contains("@@"));
    }

    #[test]
    fn test_report_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        write_tree(
            &old,
            &[
                ("b/one.conf", b"1\n"),
                ("a/two.conf", b"2\n"),
                ("a/gone.conf", b"x\n"),
            ],
        );
        write_tree(
            &new,
            &[
                ("b/one.conf", b"1\nchanged\n"),
                ("a/two.conf", b"2\n"),
                ("a/new.conf", b"y\n"),
            ],
        );
        let first = run_diff(&old, &new, DiffMode::Unified);
        let second = run_diff(&old, &new, DiffMode::Unified);
        assert_eq!(first, second);
        // Lexicographic order: directory 'a' is reported before 'b'.
        assert!(first.find("gone.conf").unwrap() < first.find("one.conf").unwrap());
    }

    #[test]
    fn test_changed_diffs_precede_missing_lists_at_a_level() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old");
        let new = dir.path().join("new");
        write_tree(&old, &[("z_changed.conf", b"a\n"), ("a_gone.conf", b"x\n")]);
        write_tree(&new, &[("z_changed.conf", b"b\n")]);
        let out = run_diff(&old, &new, DiffMode::Normal);
        assert!(out.find("z_changed.conf").unwrap() < out.find("a_gone.conf").unwrap());
    }
}
