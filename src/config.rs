use crate::catalog::SortOrder;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// One configuration layer as read from a TOML file; unset keys do not override
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ConfigLayer {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default)]
    pub default_sort: Option<SortOrder>,
}

impl ConfigLayer {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let layer: ConfigLayer = toml::from_str(&content)?;
        Ok(layer)
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub timeout_ms: u64,
    pub session_file: PathBuf,
    pub default_sort: SortOrder,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_session_file() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".mdd").join("session.json"),
        None => Path::new(".mdd").join("session.json"),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: default_timeout_ms(),
            session_file: default_session_file(),
            default_sort: SortOrder::default(),
        }
    }
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.mdd/config.local.toml) > project (.mdd/config.toml) > user (~/.mdd/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".mdd").join("config.toml");
            if user_config.exists() {
                config.merge(ConfigLayer::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".mdd").join("config.toml");
        if project_config.exists() {
            config.merge(ConfigLayer::load_from(&project_config)?);
        }

        // should be gitignored
        let local_config = Path::new(".mdd").join("config.local.toml");
        if local_config.exists() {
            config.merge(ConfigLayer::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Defaults plus a single explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge(ConfigLayer::load_from(path)?);
        Ok(config)
    }

    /// Merge a layer into this config (the layer takes priority where set)
    pub fn merge(&mut self, other: ConfigLayer) {
        if let Some(url) = other.api_url {
            self.api_url = url;
        }
        if let Some(timeout) = other.timeout_ms {
            self.timeout_ms = timeout;
        }
        if let Some(path) = other.session_file {
            self.session_file = expand_home(&path);
        }
        if let Some(order) = other.default_sort {
            self.default_sort = order;
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            errors.push(ConfigError {
                field: "api_url".to_string(),
                message: format!("Expected an http(s) URL, got '{}'", self.api_url),
            });
        }

        if self.timeout_ms == 0 {
            errors.push(ConfigError {
                field: "timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.session_file.as_os_str().is_empty() {
            errors.push(ConfigError {
                field: "session_file".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
