use crate::{
    config::Config,
    extract::anthropic::AnthropicExtractor,
    layout,
    pipeline::Pipeline,
    render::{RenderChain, resolve_pdftoppm},
    report::RunSummary,
    util::{ensure_dir, now_compact},
};
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command as Process;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "shoebox")]
#[command(about = "Deterministic financial document intake and filing (extraction + naming + checkpointed batches)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./shoebox.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report whether pdftoppm and the API credential are available.
    Doctor {},
    /// Audit and repair the processed tree's client/filename structure.
    Audit {},
    /// Process every PDF in the source directory.
    Run {
        /// Override the source directory from config.
        #[arg(long)]
        source: Option<PathBuf>,
        /// Force all documents into this client folder.
        #[arg(long)]
        client: Option<String>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let mut cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg)?;
            doctor(&cfg)
        }
        Command::Audit {} => {
            let _guard = init_logging(&args, &cfg)?;
            audit(&cfg)
        }
        Command::Run { source, client } => {
            if let Some(source) = source {
                cfg.paths.source_dir = source.display().to_string();
            }
            if let Some(client) = client {
                cfg.global.client_name = client.clone();
            }
            run(&args, &cfg)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("shoebox.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("shoebox.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = if let Some(path) = resolve_log_path(cfg) {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(&path)
            .map_err(|e| anyhow!("create log file {}: {e}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.log_dir).join(format!("processing_{}.log", now_compact())))
}

fn doctor(cfg: &Config) -> Result<()> {
    let pdftoppm = resolve_pdftoppm(&cfg.rendering.pdftoppm_path);
    let version = pdftoppm.as_deref().and_then(pdftoppm_version);
    let api_key_set = std::env::var(&cfg.api.api_key_env)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);

    // Rendering is soft: without pdftoppm the run degrades to synthetic page
    // images. The API credential is the only hard requirement.
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "pdftoppm": pdftoppm.as_ref().map(|p| p.display().to_string()),
            "pdftoppm_version": version,
            "api_key_env": cfg.api.api_key_env,
            "api_key_set": api_key_set,
            "source_dir": cfg.paths.source_dir,
            "processed_dir": cfg.paths.processed_dir,
            "ok": api_key_set,
        }))?
    );
    Ok(())
}

fn pdftoppm_version(exe: &Path) -> Option<String> {
    // pdftoppm prints its version banner to stderr.
    let output = Process::new(exe).arg("-v").output().ok()?;
    let banner = String::from_utf8_lossy(&output.stderr);
    let first = banner.lines().next().unwrap_or("").trim().to_string();
    if first.is_empty() { None } else { Some(first) }
}

fn audit(cfg: &Config) -> Result<()> {
    let issues = layout::audit_tree(Path::new(&cfg.paths.processed_dir))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "processed_dir": cfg.paths.processed_dir,
            "repaired": issues.len(),
            "issues": issues,
        }))?
    );
    Ok(())
}

fn run(args: &Args, cfg: &Config) -> Result<()> {
    for dir in [
        &cfg.paths.source_dir,
        &cfg.paths.processed_dir,
        &cfg.paths.data_dir,
        &cfg.paths.log_dir,
    ] {
        ensure_dir(Path::new(dir))?;
    }

    let _guard = init_logging(args, cfg)?;
    info!("starting document intake run");
    if !cfg.global.client_name.trim().is_empty() {
        info!("single-client mode: {}", cfg.global.client_name);
    }

    let extractor = AnthropicExtractor::new(&cfg.api)?;
    let renderer = RenderChain::from_config(&cfg.rendering);
    let pipeline = Pipeline::new(cfg, extractor, renderer);
    let summary = pipeline.run()?;

    if cfg.global.print_summary {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("{}", "=".repeat(60));
    println!("Processing complete!");
    println!("  processed:             {}", summary.processed());
    println!("  succeeded first try:   {}", summary.succeeded);
    println!("  succeeded after retry: {}", summary.retry_succeeded);
    println!("  failed:                {}", summary.failed);
    println!("  skipped (checkpoint):  {}", summary.skipped_checkpointed);
    if let Some(path) = &summary.failed_list_path {
        println!("  failed list: {path}");
    }
    if !summary.per_client.is_empty() {
        println!("Per-client counts:");
        let mut ordered: Vec<_> = summary.per_client.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (client, count) in ordered {
            println!("  {client}: {count}");
        }
    }
    println!("{}", "=".repeat(60));
}
