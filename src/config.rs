use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CairnConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Store file path. `None` means `<cwd>/data/memory.jsonl`; a relative
    /// value is resolved against the executable's directory.
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub top_per_token: usize,
    pub min_relative_score: f64,
    pub max_path_length: usize,
    pub max_total_nodes: usize,
}

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8571,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { file_path: None }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_per_token: 1,
            min_relative_score: 0.3,
            max_path_length: 5,
            max_total_nodes: 50,
        }
    }
}

/// Returns `~/.cairn/`
pub fn default_cairn_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".cairn")
}

/// Returns the default config file path: `~/.cairn/config.toml`
pub fn default_config_path() -> PathBuf {
    default_cairn_dir().join("config.toml")
}

impl CairnConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CairnConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides: `MEMORY_FILE_PATH`, the
    /// `SEARCH_*` tuning knobs, and `CAIRN_LOG_LEVEL`.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEMORY_FILE_PATH") {
            self.storage.file_path = Some(val);
        }
        if let Ok(val) = std::env::var("CAIRN_LOG_LEVEL") {
            self.server.log_level = val;
        }
        override_parsed("SEARCH_TOP_PER_TOKEN", &mut self.search.top_per_token);
        override_parsed(
            "SEARCH_MIN_RELATIVE_SCORE",
            &mut self.search.min_relative_score,
        );
        override_parsed("SEARCH_MAX_PATH_LENGTH", &mut self.search.max_path_length);
        override_parsed("SEARCH_MAX_TOTAL_NODES", &mut self.search.max_total_nodes);
    }

    /// Resolve the store file path.
    ///
    /// A configured absolute path (or `~/` path) is used as-is; a configured
    /// relative path is resolved against the executable's directory. When
    /// nothing is configured the store lives at `<cwd>/data/memory.jsonl`.
    pub fn resolved_file_path(&self) -> PathBuf {
        match &self.storage.file_path {
            Some(configured) => {
                let expanded = expand_tilde(configured);
                if expanded.is_absolute() {
                    expanded
                } else {
                    exe_dir().join(expanded)
                }
            }
            None => std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("data")
                .join("memory.jsonl"),
        }
    }
}

/// Override `target` from an env var, keeping the current value (with a
/// warning) when the var does not parse.
fn override_parsed<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(val) = std::env::var(var) {
        match val.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!("ignoring unparsable {var}={val}"),
        }
    }
}

/// Directory containing the running executable, falling back to the cwd.
fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
