//! Configuration for covtrack

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::{DEFAULT_DATA_FILE, DEFAULT_RESULTS_DIR};

/// Project-local config file name
pub const LOCAL_CONFIG: &str = "covtrack.yml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Results directory, relative to the invocation root
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Raw instrumentation data file, relative to the invocation root
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Exit non-zero when coverage regresses
    #[serde(default = "default_fail_on_regression")]
    pub fail_on_regression: bool,

    /// Command that prints the coverage summary, e.g. `["coverage", "report"]`
    #[serde(default)]
    pub summary_command: Option<Vec<String>>,

    /// Dotted package names whose modules the preload pass enumerates
    #[serde(default)]
    pub packages: Vec<String>,

    /// Source file extension of modules
    #[serde(default = "default_module_extension")]
    pub module_extension: String,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_DIR)
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_fail_on_regression() -> bool {
    true
}

fn default_module_extension() -> String {
    "py".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            data_file: default_data_file(),
            fail_on_regression: default_fail_on_regression(),
            summary_command: None,
            packages: Vec::new(),
            module_extension: default_module_extension(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise `<root>/covtrack.yml`, then
    /// `~/.config/covtrack/config.yml`, then defaults; an unreadable fallback
    /// file is logged and skipped.
    pub fn load(config_path: Option<&PathBuf>, root: &Path) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let candidates = [
            Some(root.join(LOCAL_CONFIG)),
            dirs::config_dir().map(|p| p.join("covtrack").join("config.yml")),
        ];

        for path in candidates.iter().flatten() {
            if path.exists() {
                match Self::load_from_file(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(Config::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
