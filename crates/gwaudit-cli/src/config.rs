//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gwaudit_core::{BatchSizes, RetrySettings};
use gwaudit_google::{Classifier, MY_CUSTOMER};
use serde::Deserialize;

/// Global configuration for gwaudit
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub output: OutputConfig,
    pub retry: RetrySettings,
    pub batch: BatchSizes,
    pub http: HttpConfig,
    /// File this configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub access_token: Option<String>,
    pub customer_id: String,
    /// Command printing an access token for `{subject}`, used by the Apps
    /// Script audit to act as each user.
    pub delegated_token_command: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            customer_id: MY_CUSTOMER.to_string(),
            delegated_token_command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Each run writes into `<reports_root>/output_<timestamp>`.
    pub reports_root: PathBuf,
    pub drive_folder: String,
    pub upload: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            reports_root: PathBuf::from("./reports"),
            drive_folder: "root".to_string(),
            upload: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub classifier: Classifier,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            classifier: Classifier::default(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./gwaudit.toml (current directory)
    /// 2. ~/.config/gwaudit/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("gwaudit.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "gwaudit") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }
}
