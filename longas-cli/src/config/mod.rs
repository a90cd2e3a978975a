//! Configuration loaded from TOML, with built-in defaults

pub mod layout;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pdf::TableSettings;

pub use layout::{CellRef, SheetLayout};

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV: &str = "LONGAS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base workbook; read only, never modified
    pub template: PathBuf,
    /// Directory receiving the dated artifact
    pub output_dir: PathBuf,
    pub layout: SheetLayout,
    pub extraction: TableSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template: PathBuf::from("Longas.xlsx"),
            output_dir: PathBuf::from("."),
            layout: SheetLayout::default(),
            extraction: TableSettings::default(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration")
    }

    /// Load the configuration.
    ///
    /// An explicit path must exist. Otherwise `$LONGAS_CONFIG` and then
    /// `<config dir>/longas-cli/config.toml` are tried, and defaults apply
    /// when neither exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::read(Path::new(&path));
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::read(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&text).with_context(|| format!("In {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// `~/.config/longas-cli/config.toml` (platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("longas-cli").join("config.toml"))
}
