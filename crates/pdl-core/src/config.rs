use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner::{MediaKind, Version};

/// Default number of jobs (assets) transferred at once.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

/// Default read/write chunk used by transfers; progress is reported once per chunk.
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 256 * 1024;

/// Which versions are requested per media kind (optional `[transfer]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Versions requested for images, in order.
    pub image_versions: Vec<Version>,
    /// Versions requested for video and audio, in order.
    pub video_versions: Vec<Version>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            image_versions: MediaKind::Image.default_versions().to_vec(),
            video_versions: MediaKind::Video.default_versions().to_vec(),
        }
    }
}

impl TransferConfig {
    /// Ordered versions to request for `kind`. Unknown kinds get none.
    pub fn versions_for(&self, kind: MediaKind) -> &[Version] {
        match kind {
            MediaKind::Image => &self.image_versions,
            MediaKind::Video | MediaKind::Audio => &self.video_versions,
            MediaKind::Unknown => &[],
        }
    }
}

/// Global configuration loaded from `~/.config/pdl/config.toml`.
///
/// Keys missing from the file take their default value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdlConfig {
    /// Maximum number of assets downloading at once.
    pub max_concurrent_jobs: usize,
    /// Transfer chunk size in bytes.
    pub chunk_size_bytes: usize,
    /// Include assets flagged hidden in the library.
    pub include_hidden: bool,
    /// Library directory used when `pdl run` gets no `--library`.
    pub library_dir: Option<PathBuf>,
    /// Destination directory used when `pdl run` gets no `--dest`.
    pub download_dir: Option<PathBuf>,
    /// Optional per-kind version lists; if missing, all versions are requested.
    pub transfer: Option<TransferConfig>,
}

impl Default for PdlConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            include_hidden: true,
            library_dir: None,
            download_dir: None,
            transfer: None,
        }
    }
}

impl PdlConfig {
    /// Effective transfer section (built-in defaults when absent).
    pub fn transfer(&self) -> TransferConfig {
        self.transfer.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PdlConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as `load_or_init` with an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<PdlConfig> {
    if !path.exists() {
        let default_cfg = PdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: PdlConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
