//! Per-document filing: clean the extracted fields, plan the name, move the
//! PDF under its client folder, and write the metadata sidecar.

use crate::config::Config;
use crate::extract::RawExtraction;
use crate::retry::{Attempted, RetryPolicy};
use crate::util::{ensure_dir, now_rfc3339};
use crate::{layout, name_plan, normalize, sanitize};
use anyhow::Result;
use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Sanitized, normalized copies of the extracted fields. The raw values are
/// preserved separately on [`RawExtraction`].
#[derive(Debug, Clone)]
pub struct CleanedMetadata {
    pub client: String,
    pub doc_type: String,
    pub period: String,
    pub institution: String,
}

#[derive(Debug, Clone)]
pub struct OrganizedDocument {
    pub client: String,
    pub pdf_path: PathBuf,
    pub sidecar_path: PathBuf,
}

pub fn clean_metadata(cfg: &Config, source: &Path, raw: &RawExtraction) -> CleanedMetadata {
    let client_raw = if cfg.global.client_name.trim().is_empty() {
        resolve_client_name(source, &raw.client_name)
    } else {
        cfg.global.client_name.clone()
    };

    CleanedMetadata {
        client: sanitize::sanitize_client(&client_raw),
        doc_type: sanitize::sanitize_token(&normalize::normalize_doc_type(&raw.document_type)),
        period: sanitize::sanitize_token(&normalize::normalize_period(
            &raw.period_year,
            &cfg.naming.fallback_year,
        )),
        institution: sanitize::sanitize_token(&normalize::normalize_institution(&raw.institution)),
    }
}

/// When extraction yields no usable client name, fall back to the source
/// filename: the segment before the first underscore, if it looks like a name.
/// An empty result sanitizes to the fixed placeholder folder.
fn resolve_client_name(source: &Path, extracted: &str) -> String {
    let extracted = extracted.trim();
    if !extracted.is_empty() && !extracted.eq_ignore_ascii_case("unknown") {
        return extracted.to_string();
    }
    let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let head = stem.split('_').next().unwrap_or("");
    if head.len() >= 3 {
        info!("derived client name from filename: {head}");
        head.to_string()
    } else {
        String::new()
    }
}

/// File one document under `<processed_dir>/<client>/`. Fails with a
/// non-retryable error if the final path violates the two-component invariant.
pub fn organize_document(
    cfg: &Config,
    source: &Path,
    raw: &RawExtraction,
) -> Result<OrganizedDocument> {
    let cleaned = clean_metadata(cfg, source, raw);
    let base = name_plan::compose(
        &cleaned.doc_type,
        &cleaned.period,
        Some(&cleaned.institution),
        cfg.naming.max_base_len,
    );

    let root = Path::new(&cfg.paths.processed_dir);
    ensure_dir(root)?;
    let dest = layout::resolve_destination(root, &cleaned.client, &base)?;

    copy_with_retries(cfg, source, &dest.pdf)?;
    layout::verify_organized(root, &dest.pdf)?;

    // Sidecar write failure is logged and swallowed: the PDF landed, so the
    // document still counts as organized.
    if let Err(err) = write_sidecar(source, raw, &cleaned, &dest) {
        warn!("could not write metadata sidecar for {}: {err:#}", source.display());
    }

    if cfg.global.delete_source {
        delete_source(source);
    }

    info!("organized {} -> {}", source.display(), dest.pdf.display());
    Ok(OrganizedDocument {
        client: dest.client,
        pdf_path: dest.pdf,
        sidecar_path: dest.sidecar,
    })
}

fn copy_with_retries(cfg: &Config, source: &Path, dest: &Path) -> Result<()> {
    let policy = RetryPolicy::fixed(cfg.retry.copy_max_attempts, Duration::from_secs(1));
    let outcome = policy.run("file copy", |_| {
        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }
        std::fs::copy(source, dest)
            .with_context(|| format!("copy {} -> {}", source.display(), dest.display()))?;
        Ok(())
    });
    match outcome {
        Attempted::Succeeded { .. } => Ok(()),
        Attempted::Failed { attempts, error } => {
            Err(error.context(format!("file copy failed after {attempts} attempts")))
        }
    }
}

fn write_sidecar(
    source: &Path,
    raw: &RawExtraction,
    cleaned: &CleanedMetadata,
    dest: &layout::Destination,
) -> Result<()> {
    let payload = serde_json::json!({
        "document_type": raw.document_type,
        "client_name": raw.client_name,
        "period_year": raw.period_year,
        "institution": raw.institution,
        "account_number": raw.account_number,
        "total_value": raw.total_value,
        "raw_response": raw.raw_response,
        "cleaned": {
            "client_folder": cleaned.client,
            "document_type": cleaned.doc_type,
            "period": cleaned.period,
            "institution": cleaned.institution,
        },
        "processing": {
            "original_filename": source.file_name().and_then(|s| s.to_str()).unwrap_or(""),
            "processed_at": now_rfc3339(),
            "client_folder": dest.client,
            "filename": dest.pdf.file_name().and_then(|s| s.to_str()).unwrap_or(""),
        },
    });
    std::fs::write(&dest.sidecar, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("writing {}", dest.sidecar.display()))
}

fn delete_source(source: &Path) {
    match std::fs::remove_file(source) {
        Ok(()) => info!("deleted source file {}", source.display()),
        Err(err) => warn!("could not delete source file {}: {err}", source.display()),
    }
}
