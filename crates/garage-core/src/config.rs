use crate::checksum::Algorithm;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder replaced by `version` in `base_url` and `path`.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per download (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// What to do with a downloaded file whose hash does not match the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Leave it in the store for inspection. The next fetch sees it as stale.
    #[default]
    Keep,
    /// Remove it before reporting the mismatch.
    Delete,
}

/// Configuration loaded from `~/.config/garage/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GarageConfig {
    /// Remote location; a file's URL is `base_url` followed by its name.
    #[serde(default)]
    pub base_url: String,
    /// Local store. Defaults to `~/.cache/garage`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Environment variable that, when set, overrides `path`.
    #[serde(default)]
    pub env: Option<String>,
    /// Substituted for `{version}` in `base_url` and `path`.
    #[serde(default)]
    pub version: Option<String>,
    /// Registry file loaded at startup.
    #[serde(default)]
    pub registry: Option<PathBuf>,
    /// Algorithm for registry hashes without an `<alg>:` prefix.
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default)]
    pub on_mismatch: MismatchPolicy,
    /// Connect timeout for the HTTP transport (None = library default).
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Per-file URLs that take precedence over `base_url`.
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl GarageConfig {
    /// `base_url` with `{version}` substituted and a trailing `/` ensured.
    pub fn resolved_base_url(&self) -> String {
        normalize_base_url(&self.substitute_version(&self.base_url))
    }

    /// Store directory after applying the env override, `{version}` and the default.
    pub fn resolved_store_path(&self) -> Result<PathBuf> {
        if let Some(var) = &self.env {
            if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
                tracing::debug!(var = %var, "store path overridden by environment");
                return Ok(PathBuf::from(value));
            }
        }
        match &self.path {
            Some(p) => Ok(PathBuf::from(
                self.substitute_version(&p.to_string_lossy()),
            )),
            None => default_store_path(),
        }
    }

    fn substitute_version(&self, s: &str) -> String {
        match &self.version {
            Some(v) => s.replace(VERSION_PLACEHOLDER, v),
            None => s.to_string(),
        }
    }
}

/// Append `/` to a non-empty base URL that lacks one.
pub fn normalize_base_url(base_url: &str) -> String {
    if base_url.is_empty() || base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    }
}

/// `~/.cache/garage` (XDG cache home).
pub fn default_store_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("garage")?;
    Ok(xdg_dirs.get_cache_home())
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("garage")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<GarageConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: GarageConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GarageConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GarageConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}
