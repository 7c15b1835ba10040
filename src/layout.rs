//! Destination planning and the single-level directory invariant.
//!
//! Every organized document must land at exactly `<root>/<client>/<file>` —
//! two path components relative to the processed root. This module resolves
//! collision-free destinations at write time and audits/repairs trees that
//! already violate the invariant (orphan files at root, directories nested
//! inside client folders).

use crate::sanitize::UNKNOWN_CLIENT;
use crate::util::{ensure_dir, unix_epoch_secs};
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MAX_COLLISION_ATTEMPTS: u32 = 100;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Marker error for invariant violations detected after a write. Documents
/// that hit this are not retried: the same inputs would reproduce the same
/// defect.
#[derive(Debug)]
pub struct LayoutViolation(pub String);

impl fmt::Display for LayoutViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "directory invariant violated: {}", self.0)
    }
}

impl std::error::Error for LayoutViolation {}

#[derive(Debug, Clone)]
pub struct Destination {
    pub client: String,
    pub pdf: PathBuf,
    pub sidecar: PathBuf,
}

/// Resolve a collision-free `<root>/<client>/<base>.pdf` + `.json` pair,
/// creating the client directory.
pub fn resolve_destination(root: &Path, client_token: &str, base: &str) -> Result<Destination> {
    let mut client = last_segment(client_token);

    let client_dir = root.join(&client);
    // The computed parent must be the root itself. A client token that fails
    // this check was corrupted somewhere upstream; collapse it again rather
    // than write outside the client level.
    if client_dir.parent() != Some(root) {
        warn!("client token {client:?} escapes the root; collapsing to its last segment");
        client = client_dir
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    }

    let client_dir = root.join(&client);
    ensure_dir(&client_dir)?;

    let (pdf, sidecar) = next_free_pair(&client_dir, base);
    Ok(Destination {
        client,
        pdf,
        sidecar,
    })
}

/// Post-write check: the organized path must sit exactly two components below
/// the root.
pub fn verify_organized(root: &Path, path: &Path) -> Result<()> {
    let rel = path.strip_prefix(root).map_err(|_| {
        anyhow::Error::new(LayoutViolation(format!(
            "{} is not under {}",
            path.display(),
            root.display()
        )))
    })?;
    let segments = rel.components().count();
    if segments != 2 {
        return Err(anyhow::Error::new(LayoutViolation(format!(
            "{} has {} components relative to {}, expected 2",
            path.display(),
            segments,
            root.display()
        ))));
    }
    Ok(())
}

/// Audit the processed tree and repair invariant violations in place.
///
/// Returns human-readable descriptions of every issue found; an empty list
/// means the tree was already clean. Running the audit twice in a row yields
/// no further changes.
pub fn audit_tree(root: &Path) -> Result<Vec<String>> {
    let mut issues = Vec::new();
    if !root.exists() {
        return Ok(issues);
    }

    // Snapshot the children before mutating anything under the root.
    let top: Vec<PathBuf> = std::fs::read_dir(root)
        .with_context(|| format!("read_dir {}", root.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();

    for path in &top {
        if path.is_file() {
            issues.push(format!("file directly under root: {}", path.display()));
            if let Err(err) = move_to_uncategorized(root, path) {
                warn!("could not relocate {}: {err:#}", path.display());
            }
        } else if path.is_dir() {
            let nested: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("read_dir {}", path.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_dir())
                .collect();
            for dir in nested {
                issues.push(format!(
                    "directory nested inside client folder: {}",
                    dir.display()
                ));
                if let Err(err) = hoist_nested_dir(&dir, path) {
                    warn!("could not flatten {}: {err:#}", dir.display());
                }
            }
        }
    }

    Ok(issues)
}

fn move_to_uncategorized(root: &Path, orphan: &Path) -> Result<()> {
    let bin = root.join(UNCATEGORIZED);
    ensure_dir(&bin)?;
    let name = orphan
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("orphan");
    let dest = next_free_path(&bin, name);
    std::fs::rename(orphan, &dest)
        .with_context(|| format!("move {} -> {}", orphan.display(), dest.display()))?;
    info!("relocated orphan file to {}", dest.display());
    Ok(())
}

/// Move every file under `nested` up into `client_dir`, then remove the
/// emptied directory tree.
fn hoist_nested_dir(nested: &Path, client_dir: &Path) -> Result<()> {
    let mut stack = vec![nested.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in
            std::fs::read_dir(&dir).with_context(|| format!("read_dir {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let name = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("file");
                let dest = next_free_path(client_dir, name);
                std::fs::rename(&path, &dest)
                    .with_context(|| format!("move {} -> {}", path.display(), dest.display()))?;
                info!("hoisted {} to {}", path.display(), dest.display());
            }
        }
    }
    std::fs::remove_dir_all(nested)
        .with_context(|| format!("remove emptied directory {}", nested.display()))
}

fn last_segment(token: &str) -> String {
    let tail = token
        .rsplit(|c: char| std::path::is_separator(c))
        .next()
        .unwrap_or("")
        .trim();
    if tail.is_empty() {
        UNKNOWN_CLIENT.to_string()
    } else {
        tail.to_string()
    }
}

/// First non-colliding `<dir>/<base>.pdf` + `.json` pair. Two-digit counter
/// suffixes, then an epoch-timestamp suffix after the loop guard trips.
fn next_free_pair(dir: &Path, base: &str) -> (PathBuf, PathBuf) {
    let candidate =
        |stem: &str| (dir.join(format!("{stem}.pdf")), dir.join(format!("{stem}.json")));

    let (pdf, sidecar) = candidate(base);
    if !pdf.exists() && !sidecar.exists() {
        return (pdf, sidecar);
    }
    for n in 1..=MAX_COLLISION_ATTEMPTS {
        let (pdf, sidecar) = candidate(&format!("{base}_{n:02}"));
        if !pdf.exists() && !sidecar.exists() {
            return (pdf, sidecar);
        }
    }
    candidate(&format!("{base}_{}", unix_epoch_secs()))
}

/// Single-file variant used by the audit, preserving the original extension.
fn next_free_path(dir: &Path, file_name: &str) -> PathBuf {
    let first = dir.join(file_name);
    if !first.exists() {
        return first;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s, Some(e)),
        _ => (file_name, None),
    };
    let with_suffix = |suffix: &str| match ext {
        Some(e) => dir.join(format!("{stem}_{suffix}.{e}")),
        None => dir.join(format!("{stem}_{suffix}")),
    };

    for n in 1..=MAX_COLLISION_ATTEMPTS {
        let candidate = with_suffix(&format!("{n:02}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    with_suffix(&unix_epoch_secs().to_string())
}
