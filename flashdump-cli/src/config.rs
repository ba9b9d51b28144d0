//! Configuration file support for flashdump.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (FLASHDUMP_*)
//! 3. Local config file (./flashdump.toml)
//! 4. Global config file (~/.config/flashdump/config.toml)

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the local configuration file.
pub const LOCAL_CONFIG_FILE: &str = "flashdump.toml";

/// Default dump parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Default start address (hex text, e.g. "0x08000000").
    pub address: Option<String>,
    /// Default length (e.g. "4096", "0x1000", "4k").
    pub length: Option<String>,
    /// Default output format name.
    pub format: Option<String>,
    /// Default source ("mock", "mock:<pattern>", "file:<path>").
    pub source: Option<String>,
    /// Directory for generated dump files.
    pub output_dir: Option<PathBuf>,
}

/// Intel HEX encoder defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntelHexConfig {
    /// Emit extended linear address records.
    #[serde(default)]
    pub extended_linear: bool,
}

/// S-record encoder defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SRecordConfig {
    /// Emit a count record and computed S7 terminator.
    #[serde(default)]
    pub computed_terminator: bool,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dump defaults.
    #[serde(default)]
    pub dump: DumpConfig,
    /// Intel HEX defaults.
    #[serde(default)]
    pub intel_hex: IntelHexConfig,
    /// S-record defaults.
    #[serde(default)]
    pub srecord: SRecordConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Local config overrides global
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "flashdump").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        let dump = other.dump;
        if dump.address.is_some() {
            self.dump.address = dump.address;
        }
        if dump.length.is_some() {
            self.dump.length = dump.length;
        }
        if dump.format.is_some() {
            self.dump.format = dump.format;
        }
        if dump.source.is_some() {
            self.dump.source = dump.source;
        }
        if dump.output_dir.is_some() {
            self.dump.output_dir = dump.output_dir;
        }

        if other.intel_hex.extended_linear {
            self.intel_hex.extended_linear = true;
        }
        if other.srecord.computed_terminator {
            self.srecord.computed_terminator = true;
        }
    }
}
