//! Renderers for the three classic diff styles: normal, context, unified.

use std::io::Write;

use anyhow::Result;
use termcolor::{Color, ColorSpec, WriteColor};

use super::myers::{Region, diff_regions};

/// Diff rendering style, selected by the `--mode` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    Normal,
    Context,
    Unified,
}

impl DiffMode {
    /// Map the CLI flag value to a mode. Anything unrecognized falls back
    /// to normal, matching how the original tool picked its diff flag.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "context" => DiffMode::Context,
            "unified" => DiffMode::Unified,
            _ => DiffMode::Normal,
        }
    }
}

const CONTEXT_LINES: usize = 3;

/// Render the line diff between two texts to `sink`. Emits nothing when the
/// line sequences are equal.
pub fn render_diff(
    old_text: &str,
    new_text: &str,
    mode: DiffMode,
    sink: &mut dyn WriteColor,
) -> Result<()> {
    let old: Vec<&str> = old_text.lines().collect();
    let new: Vec<&str> = new_text.lines().collect();
    let regions = diff_regions(&old, &new);
    if regions.is_empty() {
        return Ok(());
    }
    match mode {
        DiffMode::Normal => render_normal(&old, &new, &regions, sink),
        DiffMode::Unified => render_unified(&old, &new, &regions, sink),
        DiffMode::Context => render_context(&old, &new, &regions, sink),
    }
}

fn write_colored(sink: &mut dyn WriteColor, color: Color, text: &str) -> Result<()> {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    sink.set_color(&spec)?;
    writeln!(sink, "{text}")?;
    sink.reset()?;
    Ok(())
}

/// Format a range the way `diff` does in normal mode: 1-based, a bare
/// position when the range is empty ("the line before").
fn normal_range(start: usize, len: usize) -> String {
    match len {
        0 => start.to_string(),
        1 => (start + 1).to_string(),
        _ => format!("{},{}", start + 1, start + len),
    }
}

fn render_normal(
    old: &[&str],
    new: &[&str],
    regions: &[Region],
    sink: &mut dyn WriteColor,
) -> Result<()> {
    for r in regions {
        let letter = match (r.old_len, r.new_len) {
            (0, _) => 'a',
            (_, 0) => 'd',
            _ => 'c',
        };
        writeln!(
            sink,
            "{}{}{}",
            normal_range(r.old_start, r.old_len),
            letter,
            normal_range(r.new_start, r.new_len)
        )?;
        for line in &old[r.old_start..r.old_start + r.old_len] {
            write_colored(sink, Color::Red, &format!("< {line}"))?;
        }
        if letter == 'c' {
            writeln!(sink, "---")?;
        }
        for line in &new[r.new_start..r.new_start + r.new_len] {
            write_colored(sink, Color::Green, &format!("> {line}"))?;
        }
    }
    Ok(())
}

/// A group of nearby regions plus the surrounding context window.
struct Hunk {
    old_start: usize,
    old_len: usize,
    new_start: usize,
    new_len: usize,
    regions: Vec<Region>,
}

/// Group regions whose gap is within two context windows into hunks and
/// attach up to [`CONTEXT_LINES`] unchanged lines on each side.
fn build_hunks(old_total: usize, new_total: usize, regions: &[Region]) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut current: Vec<Region> = Vec::new();
    for r in regions {
        if let Some(last) = current.last() {
            let gap = r.old_start - (last.old_start + last.old_len);
            if gap > CONTEXT_LINES * 2 {
                hunks.push(finish_hunk(old_total, new_total, std::mem::take(&mut current)));
            }
        }
        current.push(*r);
    }
    if !current.is_empty() {
        hunks.push(finish_hunk(old_total, new_total, current));
    }
    hunks
}

fn finish_hunk(old_total: usize, new_total: usize, regions: Vec<Region>) -> Hunk {
    let first = regions[0];
    let last = regions[regions.len() - 1];
    // Unchanged runs have the same length on both sides, so one clamped
    // context width keeps the two sides aligned.
    let lead = CONTEXT_LINES.min(first.old_start).min(first.new_start);
    let trail = CONTEXT_LINES
        .min(old_total - (last.old_start + last.old_len))
        .min(new_total - (last.new_start + last.new_len));
    let old_start = first.old_start - lead;
    let new_start = first.new_start - lead;
    Hunk {
        old_start,
        old_len: last.old_start + last.old_len + trail - old_start,
        new_start,
        new_len: last.new_start + last.new_len + trail - new_start,
        regions,
    }
}

/// Format a range the way unified headers do: `start,count` with a 1-based
/// start, collapsed to a bare number when the count is one.
fn unified_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => (start + 1).to_string(),
        _ => format!("{},{}", start + 1, len),
    }
}

fn render_unified(
    old: &[&str],
    new: &[&str],
    regions: &[Region],
    sink: &mut dyn WriteColor,
) -> Result<()> {
    for hunk in build_hunks(old.len(), new.len(), regions) {
        writeln!(
            sink,
            "@@ -{} +{} @@",
            unified_range(hunk.old_start, hunk.old_len),
            unified_range(hunk.new_start, hunk.new_len)
        )?;
        let mut pos = hunk.old_start;
        for r in &hunk.regions {
            for line in &old[pos..r.old_start] {
                writeln!(sink, " {line}")?;
            }
            for line in &old[r.old_start..r.old_start + r.old_len] {
                write_colored(sink, Color::Red, &format!("-{line}"))?;
            }
            for line in &new[r.new_start..r.new_start + r.new_len] {
                write_colored(sink, Color::Green, &format!("+{line}"))?;
            }
            pos = r.old_start + r.old_len;
        }
        for line in &old[pos..hunk.old_start + hunk.old_len] {
            writeln!(sink, " {line}")?;
        }
    }
    Ok(())
}

/// Format a range the way context headers do: 1-based inclusive bounds.
fn context_range(start: usize, len: usize) -> String {
    match len {
        0 => start.to_string(),
        1 => (start + 1).to_string(),
        _ => format!("{},{}", start + 1, start + len),
    }
}

fn render_context(
    old: &[&str],
    new: &[&str],
    regions: &[Region],
    sink: &mut dyn WriteColor,
) -> Result<()> {
    for hunk in build_hunks(old.len(), new.len(), regions) {
        writeln!(sink, "***************")?;
        writeln!(sink, "*** {} ****", context_range(hunk.old_start, hunk.old_len))?;
        if hunk.regions.iter().any(|r| r.old_len > 0) {
            let mut pos = hunk.old_start;
            for r in &hunk.regions {
                for line in &old[pos..r.old_start] {
                    writeln!(sink, "  {line}")?;
                }
                let marker = if r.new_len > 0 { '!' } else { '-' };
                for line in &old[r.old_start..r.old_start + r.old_len] {
                    write_colored(sink, Color::Red, &format!("{marker} {line}"))?;
                }
                pos = r.old_start + r.old_len;
            }
            for line in &old[pos..hunk.old_start + hunk.old_len] {
                writeln!(sink, "  {line}")?;
            }
        }
        writeln!(sink, "--- {} ----", context_range(hunk.new_start, hunk.new_len))?;
        if hunk.regions.iter().any(|r| r.new_len > 0) {
            let mut pos = hunk.new_start;
            for r in &hunk.regions {
                for line in &new[pos..r.new_start] {
                    writeln!(sink, "  {line}")?;
                }
                let marker = if r.old_len > 0 { '!' } else { '+' };
                for line in &new[r.new_start..r.new_start + r.new_len] {
                    write_colored(sink, Color::Green, &format!("{marker} {line}"))?;
                }
                pos = r.new_start + r.new_len;
            }
            for line in &new[pos..hunk.new_start + hunk.new_len] {
                writeln!(sink, "  {line}")?;
            }
        }
    }
    Ok(())
}
