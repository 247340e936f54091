//! Configuration for mcs_tool
//!
//! Stored as TOML at `~/.config/mcs/mcs_tool.toml`. Every field has a
//! default, so a partial file (or none at all) is valid. Command-line flags
//! override what is loaded here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use mcs_transport::protocol;

/// Default read size for `recv`
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Traffic monitor settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Wrap the module in the traffic printer
    pub enabled: bool,
    /// Dump payload bytes in hex
    pub show_hex: bool,
    /// Print one JSON object per call instead of text
    pub json: bool,
    /// Only show traffic for this channel
    pub channel: Option<u16>,
}

/// Top-level tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McsToolConfig {
    /// Explicit path to nnsmcs.dll (library search path if unset)
    pub library_path: Option<PathBuf>,
    /// Channel used when `--channel` is not given
    pub default_channel: u16,
    /// Open flags used when `--flags` is not given
    pub default_flags: u32,
    /// Bytes per read call
    pub chunk_size: usize,
    /// Open with NNS_McsOpenStreamEx so the device type is known
    pub use_ex: bool,
    pub monitor: MonitorConfig,
}

impl Default for McsToolConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            default_channel: 0,
            default_flags: protocol::flags::NONE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            use_ex: true,
            monitor: MonitorConfig::default(),
        }
    }
}

impl McsToolConfig {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mcs")
            .join("mcs_tool.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: McsToolConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Library to load: configured path, else the module name
    pub fn library(&self) -> PathBuf {
        self.library_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(protocol::MODULE_NAME))
    }
}
