//! Tool settings: where UDLF is installed and where it comes from.
//!
//! Saved as JSON. Lookup order for a run is an explicit `--settings` file,
//! then `$UDLF_HOME/settings.json`, then defaults. The `UDLF_HOME`,
//! `UDLF_BIN` and `UDLF_CONFIG` environment variables override whatever
//! was loaded.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::assets::Installation;

/// Persisted tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding `bin/udlf` and `bin/config.ini`
    pub install_dir: PathBuf,
    /// Binary outside the install dir
    pub binary_path: Option<PathBuf>,
    /// Default config outside the install dir
    pub config_path: Option<PathBuf>,
    /// Archive URL, when not the platform default
    pub download_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_dir: Installation::default_dir().unwrap_or_else(|_| PathBuf::from(".udlf")),
            binary_path: None,
            config_path: None,
            download_url: None,
        }
    }
}

impl Settings {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let settings: Self =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;

        Ok(settings)
    }

    /// Settings for this process: file lookup, then environment overrides
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let home_file = env::var_os("UDLF_HOME")
                    .map(|home| PathBuf::from(home).join("settings.json"));
                match home_file {
                    Some(path) if path.is_file() => Self::load_from_file(&path)?,
                    _ => Self::default(),
                }
            }
        };
        settings.apply_overrides(|key| env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `UDLF_HOME`, `UDLF_BIN` and `UDLF_CONFIG` from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(home) = lookup("UDLF_HOME").filter(|v| !v.is_empty()) {
            self.install_dir = PathBuf::from(home);
        }
        if let Some(bin) = lookup("UDLF_BIN").filter(|v| !v.is_empty()) {
            self.binary_path = Some(PathBuf::from(bin));
        }
        if let Some(config) = lookup("UDLF_CONFIG").filter(|v| !v.is_empty()) {
            self.config_path = Some(PathBuf::from(config));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.install_dir.as_os_str().is_empty() {
            bail!("Install directory cannot be empty");
        }
        if let Some(url) = &self.download_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("Download URL must be http(s): {}", url);
            }
        }
        if let Some(config) = &self.config_path {
            if config.extension().and_then(|e| e.to_str()) != Some("ini") {
                bail!("Config path must end with '.ini': {:?}", config);
            }
        }
        Ok(())
    }

    /// Installation described by these settings
    pub fn installation(&self) -> Installation {
        let mut installation = Installation::new(&self.install_dir);
        if let Some(bin) = &self.binary_path {
            installation = installation.with_binary_path(bin);
        }
        if let Some(config) = &self.config_path {
            installation = installation.with_config_path(config);
        }
        if let Some(url) = &self.download_url {
            installation = installation.with_download_url(url);
        }
        installation
    }
}
