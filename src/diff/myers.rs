//! Shortest-edit-script line comparison (Myers' O(ND) greedy search).
//!
//! Replaces the external `diff` binary the original workflow shelled out to.
//! The search is fully deterministic: identical inputs always produce the
//! same script, so report output is reproducible byte for byte.

/// A contiguous changed region between two line sequences: `old_len` lines
/// removed starting at `old_start`, `new_len` lines added starting at
/// `new_start` (0-based). Regions are ordered, non-overlapping, and separated
/// by at least one unchanged line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
}

/// Compute the changed regions between `old` and `new`.
pub fn diff_regions(old: &[&str], new: &[&str]) -> Vec<Region> {
    let n = old.len();
    let m = new.len();
    if n + m == 0 {
        return Vec::new();
    }
    let max = (n + m) as isize;
    let offset = max;
    let width = 2 * (n + m) + 1;

    // Forward search: v[k + offset] holds the furthest x reachable on
    // diagonal k with the current number of edits. One snapshot per edit
    // count is kept for the backtrack.
    let mut v = vec![0isize; width];
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut found_d = 0isize;
    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while (x as usize) < n && (y as usize) < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x as usize >= n && y as usize >= m {
                found_d = d;
                break 'search;
            }
            k += 2;
        }
    }

    // Backtrack from (n, m), accumulating deletions/insertions until an
    // unchanged line closes the pending region.
    let mut regions: Vec<Region> = Vec::new();
    let mut x = n as isize;
    let mut y = m as isize;
    let mut del = 0usize;
    let mut ins = 0usize;
    for d in (1..=found_d).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;
        let (mid_x, mid_y) = if prev_k == k + 1 {
            (prev_x, prev_y + 1)
        } else {
            (prev_x + 1, prev_y)
        };
        if x > mid_x {
            // Unchanged diagonal run between the edit and (x, y).
            flush(&mut regions, x, y, &mut del, &mut ins);
        }
        x = mid_x;
        y = mid_y;
        if prev_k == k + 1 {
            ins += 1;
            y = prev_y;
        } else {
            del += 1;
            x = prev_x;
        }
    }
    flush(&mut regions, x, y, &mut del, &mut ins);
    regions.reverse();
    regions
}

fn flush(regions: &mut Vec<Region>, x: isize, y: isize, del: &mut usize, ins: &mut usize) {
    if *del > 0 || *ins > 0 {
        regions.push(Region {
            old_start: x as usize,
            old_len: *del,
            new_start: y as usize,
            new_len: *ins,
        });
        *del = 0;
        *ins = 0;
    }
}
