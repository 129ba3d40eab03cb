use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("RIDGEID_CONFIG_PATH").unwrap_or("/usr/local/etc/ridgeid/config.toml"))
});

/// Service configuration.
///
/// `threshold` deliberately has no default: past deployments disagreed on
/// the value, so every installation must state the one it operates under.
/// A config file without it fails to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cosine similarity at or above which a comparison counts as a match.
    pub threshold: f32,
    /// Root directory holding `segmentation/` and `recognition/` artifacts.
    pub model_dir: PathBuf,
    /// Reference store location.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

pub fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "ridgeid")
        .map(|dirs| dirs.data_dir().join("references.bin"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/ridgeid/references.bin"))
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    validate_threshold(cfg.threshold)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

/// Cosine similarity lives in [-1, 1]; anything outside can never match or
/// always matches, which is a configuration mistake either way.
pub fn validate_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        bail!("threshold {threshold} outside the cosine range [-1, 1]");
    }
    Ok(())
}
