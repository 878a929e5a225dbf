use std::path::{Path, PathBuf};

use ratchet_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

const CONFIG_FILES: &[&str] = &["config.yml", "config.yaml", "config.toml"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// `~/.config/ratchet` (or the platform equivalent).
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ratchet"))
    }

    /// Parse a config file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: AppConfig = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}")))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the first config file found in `dir`, or defaults when there is none.
    pub fn load_from_dir(dir: &Path) -> Result<AppConfig> {
        match Self::find_in(dir) {
            Some(path) => Self::load(&path),
            None => {
                debug!("no config file in {}, using defaults", dir.display());
                Ok(AppConfig::default())
            }
        }
    }

    /// First of `config.yml`, `config.yaml`, `config.toml` present in `dir`.
    pub fn find_in(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    pub fn to_yaml(config: &AppConfig) -> Result<String> {
        serde_yaml::to_string(config)
            .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))
    }
}
