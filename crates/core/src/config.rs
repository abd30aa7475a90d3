//! Application configuration.
//!
//! Values come from built-in defaults, then `config.toml` in the user's
//! config directory, then `TALLY_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{models::PlayerColor, save::SaveManager};

/// Directory under `~/.config` holding the configuration file.
pub const CONFIG_DIR: &str = "meeple-tally";

const DEFAULT_CONFIG: &str = r#"# meeple-tally configuration

# Where the running session is stored.
# save_path = "/home/me/.local/share/meeple-tally/session.json"

# Player counts offered at setup.
min_players = 2
max_players = 5

# Default log filter when RUST_LOG is unset.
log_filter = "warn"
"#;

/// Settings shared by the front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Snapshot file for the running session.
    pub save_path: PathBuf,
    /// Smallest roster offered at setup.
    pub min_players: usize,
    /// Largest roster offered at setup.
    pub max_players: usize,
    /// Fallback tracing filter.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            save_path: SaveManager::default_path(),
            min_players: 2,
            max_players: PlayerColor::ALL.len(),
            log_filter: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration using `path` as the optional file layer.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("save_path", defaults.save_path.to_string_lossy().to_string())?
            .set_default("min_players", defaults.min_players as u64)?
            .set_default("max_players", defaults.max_players as u64)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("TALLY"))
            .build()
            .with_context(|| format!("failed to load configuration {}", path.display()))?;

        let config: Self = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Roster sizes offered at setup.
    pub fn roster_sizes(&self) -> std::ops::RangeInclusive<usize> {
        self.min_players..=self.max_players
    }

    fn validate(&self) -> Result<()> {
        if self.min_players == 0 {
            bail!("min_players must be at least 1");
        }
        if self.max_players > PlayerColor::ALL.len() {
            bail!(
                "max_players {} exceeds the {} available colours",
                self.max_players,
                PlayerColor::ALL.len()
            );
        }
        if self.min_players > self.max_players {
            bail!(
                "min_players {} is larger than max_players {}",
                self.min_players,
                self.max_players
            );
        }
        Ok(())
    }
}

/// Location of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write the commented default configuration if no file exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG).with_context(|| format!("failed to write {}", path.display()))
}
