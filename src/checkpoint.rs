use crate::util::{ensure_dir, now_compact};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Durable set of source paths already organized, enabling resumable runs.
/// The file is a single JSON array, fully rewritten on every save.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("checkpoint.json"),
        }
    }

    /// A missing or corrupt checkpoint is never fatal: the run starts from an
    /// empty set and re-processes at most what the last save did not cover.
    pub fn load(&self) -> BTreeSet<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return BTreeSet::new(),
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(paths) => paths.into_iter().collect(),
            Err(err) => {
                warn!(
                    "corrupt checkpoint {}: {err}; starting from an empty set",
                    self.path.display()
                );
                BTreeSet::new()
            }
        }
    }

    pub fn save(&self, processed: &BTreeSet<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let paths: Vec<&String> = processed.iter().collect();
        std::fs::write(&self.path, serde_json::to_string_pretty(&paths)?)
            .with_context(|| format!("writing checkpoint {}", self.path.display()))
    }
}

/// Write the per-run list of documents that exhausted their retries. Returns
/// `None` (and writes nothing) when the list is empty.
pub fn save_failed_list(log_dir: &Path, failed: &[String]) -> Result<Option<PathBuf>> {
    if failed.is_empty() {
        return Ok(None);
    }
    ensure_dir(log_dir)?;
    let path = log_dir.join(format!("failed_{}.json", now_compact()));
    std::fs::write(&path, serde_json::to_string_pretty(failed)?)
        .with_context(|| format!("writing failed list {}", path.display()))?;
    Ok(Some(path))
}
