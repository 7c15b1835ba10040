use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub batch: Batch,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub naming: Naming,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub rendering: Rendering,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: Default::default(),
            paths: Default::default(),
            batch: Default::default(),
            retry: Default::default(),
            naming: Default::default(),
            api: Default::default(),
            rendering: Default::default(),
            logging: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    /// Forces every document into this client folder when non-empty.
    /// Empty string means multi-client mode: the client is taken from the
    /// extraction result (or derived from the source filename).
    pub client_name: String,
    pub delete_source: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            client_name: "".into(),
            delete_source: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub source_dir: String,
    pub processed_dir: String,
    pub data_dir: String,
    pub log_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            source_dir: "data/source_documents".into(),
            processed_dir: "data/processed".into(),
            data_dir: "data".into(),
            log_dir: "logs".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Batch {
    pub size: usize,
    pub delay_seconds: u64,
    pub doc_delay_ms_min: u64,
    pub doc_delay_ms_max: u64,
    pub checkpoint_every: usize,
}
impl Default for Batch {
    fn default() -> Self {
        Self {
            size: 10,
            delay_seconds: 10,
            doc_delay_ms_min: 100,
            doc_delay_ms_max: 300,
            checkpoint_every: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Retry {
    /// Document-level attempts (linear backoff: attempt * unit).
    pub max_attempts: u32,
    pub delay_unit_seconds: u64,
    /// Filesystem copy attempts (fixed 1s delay between tries).
    pub copy_max_attempts: u32,
}
impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_unit_seconds: 2,
            copy_max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Naming {
    pub max_base_len: usize,
    /// Year used when the period normalizer finds no 4-digit year.
    pub fallback_year: String,
}
impl Default for Naming {
    fn default() -> Self {
        Self {
            max_base_len: 90,
            fallback_year: "2024".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Api {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_key_env: String,
    /// API-level attempts (exponential backoff: base^attempt seconds).
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub timeout_seconds: u64,
}
impl Default for Api {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-5-sonnet-latest".into(),
            max_tokens: 1024,
            api_key_env: "ANTHROPIC_API_KEY".into(),
            max_attempts: 5,
            backoff_base_seconds: 2,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rendering {
    /// Path to pdftoppm, or "auto" to probe PATH and common install dirs.
    pub pdftoppm_path: String,
    pub dpi: u32,
    pub timeout_seconds: u64,
}
impl Default for Rendering {
    fn default() -> Self {
        Self {
            pdftoppm_path: "auto".into(),
            dpi: 150,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}
