//! Batch orchestration: enumerate sources, skip checkpointed ones, and drive
//! each remaining document through render -> extract -> organize, strictly one
//! at a time.

use crate::checkpoint::{CheckpointStore, save_failed_list};
use crate::config::Config;
use crate::extract::Extractor;
use crate::layout;
use crate::organize::{self, OrganizedDocument};
use crate::render::RenderChain;
use crate::report::RunSummary;
use crate::retry::{Attempted, RetryPolicy};
use anyhow::{Context, Result};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Pipeline<X: Extractor> {
    cfg: Config,
    extractor: X,
    renderer: RenderChain,
}

impl<X: Extractor> Pipeline<X> {
    pub fn new(cfg: &Config, extractor: X, renderer: RenderChain) -> Self {
        Self {
            cfg: cfg.clone(),
            extractor,
            renderer,
        }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let sources = enumerate_sources(Path::new(&self.cfg.paths.source_dir))?;
        info!("found {} source documents", sources.len());
        self.run_documents(sources)
    }

    pub fn run_documents(&self, sources: Vec<PathBuf>) -> Result<RunSummary> {
        // Repair pass before any new document lands. Audit problems are
        // logged and never block processing.
        match layout::audit_tree(Path::new(&self.cfg.paths.processed_dir)) {
            Ok(issues) => {
                for issue in &issues {
                    warn!("structure repair: {issue}");
                }
            }
            Err(err) => warn!("directory audit failed: {err:#}"),
        }

        let store = CheckpointStore::new(Path::new(&self.cfg.paths.data_dir));
        let mut processed = store.load();

        let total = sources.len();
        let remaining: Vec<PathBuf> = sources
            .into_iter()
            .filter(|p| !processed.contains(&path_key(p)))
            .collect();
        let skipped = total - remaining.len();
        if skipped > 0 {
            info!(
                "resuming from checkpoint: {skipped} already processed, {} remaining",
                remaining.len()
            );
        }

        let mut summary = RunSummary {
            total_considered: total,
            skipped_checkpointed: skipped,
            ..Default::default()
        };
        let mut failed_docs: Vec<String> = Vec::new();
        let mut newly_processed = 0usize;

        let policy = RetryPolicy::linear(
            self.cfg.retry.max_attempts,
            Duration::from_secs(self.cfg.retry.delay_unit_seconds),
        );

        let batch_size = self.cfg.batch.size.max(1);
        let total_batches = remaining.len().div_ceil(batch_size);

        for (batch_idx, batch) in remaining.chunks(batch_size).enumerate() {
            info!(
                "batch {}/{total_batches} ({} documents)",
                batch_idx + 1,
                batch.len()
            );

            for source in batch {
                let what = format!("document {}", source.display());
                match policy.run(&what, |_| self.process_one(source)) {
                    Attempted::Succeeded {
                        value: organized,
                        attempts,
                    } => {
                        if attempts > 1 {
                            summary.retry_succeeded += 1;
                        } else {
                            summary.succeeded += 1;
                        }
                        *summary.per_client.entry(organized.client.clone()).or_insert(0) += 1;
                        processed.insert(path_key(source));
                        newly_processed += 1;
                        info!(
                            "ok {} -> {}/{}",
                            source.display(),
                            organized.client,
                            organized
                                .pdf_path
                                .file_name()
                                .and_then(|s| s.to_str())
                                .unwrap_or("")
                        );

                        if newly_processed % self.cfg.batch.checkpoint_every.max(1) == 0 {
                            if let Err(err) = store.save(&processed) {
                                warn!("checkpoint save failed: {err:#}");
                            }
                        }
                    }
                    Attempted::Failed { attempts, error } => {
                        summary.failed += 1;
                        failed_docs.push(path_key(source));
                        error!(
                            "failed after {attempts} attempts: {}: {error:#}",
                            source.display()
                        );
                    }
                }

                self.pace();
            }

            if let Err(err) = store.save(&processed) {
                warn!("checkpoint save failed: {err:#}");
            }

            if batch_idx + 1 < total_batches && self.cfg.batch.delay_seconds > 0 {
                info!("waiting {}s before next batch", self.cfg.batch.delay_seconds);
                std::thread::sleep(Duration::from_secs(self.cfg.batch.delay_seconds));
            }
        }

        store.save(&processed)?;

        summary.failed_list_path = save_failed_list(Path::new(&self.cfg.paths.log_dir), &failed_docs)?
            .map(|p| p.display().to_string());

        info!(
            "run complete: {} first-try, {} after retry, {} failed",
            summary.succeeded, summary.retry_succeeded, summary.failed
        );
        Ok(summary)
    }

    fn process_one(&self, source: &Path) -> Result<OrganizedDocument> {
        let image = self.renderer.render_first_page(source)?;
        let raw = self.extractor.extract(&image)?;
        organize::organize_document(&self.cfg, source, &raw)
    }

    /// Small randomized delay after each document, keeping the external
    /// service's rate limiter happy.
    fn pace(&self) {
        let lo = self.cfg.batch.doc_delay_ms_min;
        let hi = self.cfg.batch.doc_delay_ms_max;
        let ms = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            hi
        };
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}

/// All PDF files directly under `dir`, sorted for a deterministic batch order.
pub fn enumerate_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn path_key(p: &Path) -> String {
    p.display().to_string()
}
