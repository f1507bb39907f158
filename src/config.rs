//! Optional config file loading and the on-disk layout derived from it. Search order:
//! ./pydoc-scrape.toml, then $XDG_CONFIG_HOME/pydoc-scrape/config.toml (or ~/.config/pydoc-scrape/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

pub const LOG_DIR: &str = "logs";
pub const RESULTS_DIR: &str = "results";
pub const DOWNLOADS_DIR: &str = "downloads";
pub const CACHE_DIR: &str = "http_cache";

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Directory under which logs, results, downloads, and the HTTP cache live. Default: CWD.
    pub base_dir: Option<PathBuf>,
    /// Python documentation root.
    pub docs_url: Option<String>,
    /// PEP index root.
    pub pep_url: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Cached responses older than this are refetched. Unset: never expire.
    pub cache_expire_secs: Option<u64>,
    /// Log file size cap in bytes before rotation.
    pub log_max_bytes: Option<u64>,
    /// Rotated log files to keep.
    pub log_backups: Option<usize>,
}

/// Search order: (1) ./pydoc-scrape.toml, (2) $XDG_CONFIG_HOME/pydoc-scrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("pydoc-scrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("pydoc-scrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}

/// Directories created on demand under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn logs(&self) -> PathBuf {
        self.base.join(LOG_DIR)
    }

    pub fn results(&self) -> PathBuf {
        self.base.join(RESULTS_DIR)
    }

    pub fn downloads(&self) -> PathBuf {
        self.base.join(DOWNLOADS_DIR)
    }

    pub fn cache(&self) -> PathBuf {
        self.base.join(CACHE_DIR)
    }
}
