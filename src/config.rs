//! Configuration handling for SolvraPad including loading and defaults.

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file inside the user's config directory.
const CONFIG_FILE: &str = "pad.toml";

/// Configuration model for the pad loaded from TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PadConfig {
    /// Prompt shown while waiting for a new command or cell.
    pub prompt: String,
    /// Prompt shown while collecting the body of a build cell.
    pub continuation: String,
    /// ANSI color in rendered module listings.
    pub color: bool,
    /// Number of history entries kept on disk.
    pub history_size: usize,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            prompt: "\u{001b}[1;36mpad\u{001b}[0m> ".to_string(),
            continuation: "\u{001b}[1;36m...\u{001b}[0m> ".to_string(),
            color: true,
            history_size: 1000,
        }
    }
}

impl PadConfig {
    /// Load configuration from disk or fall back to defaults when absent.
    pub fn load() -> anyhow::Result<(Self, PathBuf)> {
        let dirs = ProjectDirs::from("dev", "Solvra", "solvrapad")
            .ok_or_else(|| anyhow::anyhow!("unable to determine configuration directory"))?;
        let config_dir = dirs.config_dir();
        fs::create_dir_all(config_dir).context("creating SolvraPad config directory")?;
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok((Self::default(), path));
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        let cfg: Self = toml::from_str(&data)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        Ok((cfg, path))
    }

    /// Persist the configuration back to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = PadConfig::default();
        config.color = false;
        config.history_size = 25;
        config.save(&path).unwrap();

        let data = fs::read_to_string(&path).unwrap();
        let loaded: PadConfig = toml::from_str(&data).unwrap();
        assert!(!loaded.color);
        assert_eq!(loaded.history_size, 25);
        assert_eq!(loaded.prompt, config.prompt);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let loaded: PadConfig = toml::from_str("color = false\n").unwrap();
        assert!(!loaded.color);
        assert_eq!(loaded.history_size, PadConfig::default().history_size);
    }
}
