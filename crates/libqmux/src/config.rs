use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Longest query preview shown in "Started executing query" messages.
    #[serde(default = "default_snippet_max_len")]
    pub snippet_max_len: usize,
    /// Per-session capacity of the grid content channel. Query events are
    /// unbounded and never dropped.
    #[serde(default = "default_grid_channel_capacity")]
    pub grid_channel_capacity: usize,
    #[serde(default = "default_lifecycle_channel_capacity")]
    pub lifecycle_channel_capacity: usize,
}

impl ManagerConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// `$XDG_CONFIG_HOME/qmux/config.toml`, else under `~/.config`.
    pub fn config_path() -> PathBuf {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        base.join("qmux").join("config.toml")
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            snippet_max_len: default_snippet_max_len(),
            grid_channel_capacity: default_grid_channel_capacity(),
            lifecycle_channel_capacity: default_lifecycle_channel_capacity(),
        }
    }
}

fn default_snippet_max_len() -> usize {
    100
}

fn default_grid_channel_capacity() -> usize {
    1024
}

fn default_lifecycle_channel_capacity() -> usize {
    256
}
