//! Orchestrator configuration, loaded from TOML (SPEC_FULL §2.3).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    /// Named multi-logs to open and pump at startup.
    #[serde(default = "default_multilogs")]
    pub multilogs: Vec<String>,
    #[serde(default)]
    pub fsck: FsckConfig,
}

/// Storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// FSCK behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsckConfig {
    /// Minimum interval between progress callback invocations during a
    /// sequence-mode scan.
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,
}

fn default_multilogs() -> Vec<String> {
    vec![
        "feeds".to_string(),
        "byType".to_string(),
        "byContent".to_string(),
        "private".to_string(),
    ]
}

fn default_progress_interval_secs() -> u64 {
    3
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            multilogs: default_multilogs(),
            fsck: FsckConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
        }
    }
}

impl Default for FsckConfig {
    fn default() -> Self {
        Self {
            progress_interval_secs: default_progress_interval_secs(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from the default config file location, falling
    /// back to defaults if it doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: CoreConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// The data directory this core should open its store under.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("SSB_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("SSB_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".ssb"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/ssb"))
    }
}
