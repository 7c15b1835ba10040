//! First-page rendering via an ordered chain of strategies.
//!
//! The primary strategy shells out to poppler's `pdftoppm`; the chain always
//! ends in a synthetic page image so the pipeline has something to submit even
//! when no renderer works. A missing `pdftoppm` is a soft condition: `doctor`
//! reports it and `run` warns and falls through.

use crate::config::Rendering;
use anyhow::{Context, Result, anyhow, bail};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One rendered page, PNG-encoded.
pub struct PageImage {
    pub png: Vec<u8>,
}

pub trait RenderStrategy {
    fn name(&self) -> &'static str;
    fn render_first_page(&self, pdf: &Path) -> Result<PageImage>;
}

pub struct RenderChain {
    strategies: Vec<Box<dyn RenderStrategy>>,
}

impl RenderChain {
    pub fn new(strategies: Vec<Box<dyn RenderStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn from_config(cfg: &Rendering) -> Self {
        let mut strategies: Vec<Box<dyn RenderStrategy>> = Vec::new();
        match resolve_pdftoppm(&cfg.pdftoppm_path) {
            Some(exe) => strategies.push(Box::new(PdftoppmRenderer {
                exe,
                dpi: cfg.dpi,
                timeout: Duration::from_secs(cfg.timeout_seconds),
            })),
            None => warn!("pdftoppm not found; documents will fall back to synthetic page images"),
        }
        strategies.push(Box::new(SyntheticRenderer));
        Self::new(strategies)
    }

    pub fn render_first_page(&self, pdf: &Path) -> Result<PageImage> {
        for strategy in &self.strategies {
            match strategy.render_first_page(pdf) {
                Ok(image) => {
                    debug!(
                        "rendered {} via {} ({} bytes)",
                        pdf.display(),
                        strategy.name(),
                        image.png.len()
                    );
                    return Ok(image);
                }
                Err(err) => {
                    warn!("renderer {} failed for {}: {err:#}", strategy.name(), pdf.display());
                }
            }
        }
        bail!("no rendering strategy produced an image for {}", pdf.display())
    }
}

/// Locate the pdftoppm binary: configured path first, then PATH, then common
/// install directories. Resolved once at startup; never written back to the
/// environment.
pub fn resolve_pdftoppm(configured: &str) -> Option<PathBuf> {
    let configured = configured.trim();
    if !configured.is_empty() && !configured.eq_ignore_ascii_case("auto") {
        let p = PathBuf::from(configured);
        if p.exists() {
            return Some(p);
        }
        warn!("configured pdftoppm path does not exist: {configured}");
        return None;
    }

    let exe_name = if cfg!(windows) { "pdftoppm.exe" } else { "pdftoppm" };

    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(exe_name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    for dir in ["/opt/homebrew/bin", "/usr/local/bin", "/opt/local/bin", "/usr/bin"] {
        let candidate = Path::new(dir).join(exe_name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}

pub struct PdftoppmRenderer {
    exe: PathBuf,
    dpi: u32,
    timeout: Duration,
}

impl RenderStrategy for PdftoppmRenderer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    fn render_first_page(&self, pdf: &Path) -> Result<PageImage> {
        let tmp = tempfile::tempdir().with_context(|| "creating render scratch dir")?;
        let prefix = tmp.path().join("page");

        let mut cmd = Command::new(&self.exe);
        cmd.arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg("1")
            .arg(pdf)
            .arg(&prefix);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.exe.display()))?;
        let (status, stderr) = wait_with_timeout(&mut child, self.timeout)?;

        if !status.success() {
            bail!(
                "pdftoppm failed for {}: {}",
                pdf.display(),
                String::from_utf8_lossy(&stderr).trim()
            );
        }

        let out = prefix.with_extension("png");
        let png = std::fs::read(&out)
            .with_context(|| format!("reading rendered page {}", out.display()))?;
        Ok(PageImage { png })
    }
}

/// Wait for the child while draining stderr on a separate thread so a chatty
/// process cannot deadlock on a full pipe; kill it once the timeout elapses.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<(std::process::ExitStatus, Vec<u8>)> {
    let stderr_pipe = child.stderr.take();
    let stderr_thread = std::thread::spawn(move || -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))?;
            return Ok((status, stderr));
        }
        if started.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))?;
            bail!(
                "pdftoppm exceeded timeout ({timeout:?}); stderr: {}",
                String::from_utf8_lossy(&stderr).trim()
            );
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Last-resort strategy: a blank page with a dark banner. The extraction
/// service will report unknown fields, but the document still flows through
/// the pipeline instead of wedging it.
pub struct SyntheticRenderer;

impl RenderStrategy for SyntheticRenderer {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn render_first_page(&self, pdf: &Path) -> Result<PageImage> {
        let (width, height) = (1000u32, 1400u32);
        let mut img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
        for y in 0..60 {
            for x in 0..width {
                img.put_pixel(x, y, image::Rgb([40, 40, 40]));
            }
        }
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)
            .with_context(|| "encoding synthetic page image")?;
        info!("using synthetic page image for {}", pdf.display());
        Ok(PageImage {
            png: buf.into_inner(),
        })
    }
}
