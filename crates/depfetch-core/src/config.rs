use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Google Drive's direct-download endpoint; the identifier is appended as `id`.
pub const DEFAULT_ENDPOINT: &str = "https://docs.google.com/uc?export=download";

/// Cookie set by the provider when a download needs explicit confirmation.
pub const DEFAULT_CONFIRM_COOKIE_PREFIX: &str = "download_warning";

/// Where and how identifiers are resolved (`[provider]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Download endpoint URL. May already carry query parameters.
    pub endpoint: String,
    /// Name prefix of the confirmation cookie.
    pub confirm_cookie_prefix: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            confirm_cookie_prefix: DEFAULT_CONFIRM_COOKIE_PREFIX.to_string(),
        }
    }
}

/// Transfer parameters (`[http]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Bytes per second below which a transfer counts as stalled.
    pub low_speed_limit: u32,
    /// How long a transfer may stay stalled before it is aborted.
    pub low_speed_time_secs: u64,
    pub max_redirections: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            max_redirections: 10,
            user_agent: None,
        }
    }
}

/// Global configuration loaded from `~/.config/depfetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Bytes read from the response and written to the `.part` file per step.
    /// Cancellation is checked once per chunk.
    pub chunk_size: usize,
    /// Extract `.zip` archives into their target folder after download.
    pub extract_archives: bool,
    pub provider: ProviderConfig,
    pub http: HttpConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            extract_archives: true,
            provider: ProviderConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl FetchConfig {
    fn validate(self) -> Result<Self> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        url::Url::parse(&self.provider.endpoint)
            .with_context(|| format!("invalid provider endpoint {:?}", self.provider.endpoint))?;
        Ok(self)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("depfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<FetchConfig> {
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: FetchConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    cfg.validate()
}
