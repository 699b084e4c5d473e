use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `api_base`.
pub const API_BASE_ENV: &str = "CLOUDDOCS_API_BASE";

const CONFIG_FILE: &str = "config.toml";
const TOKEN_FILE: &str = "token";

fn default_timeout_secs() -> u64 {
    30
}

fn default_toast_ttl_secs() -> u64 {
    5
}

fn default_assistant_model() -> String {
    "anthropic.claude-3-haiku-20240307-v1:0".to_string()
}

fn default_assistant_max_tokens() -> u32 {
    500
}

/// Client configuration, read from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Backend base URL, e.g. `https://abc.execute-api.ap-south-1.amazonaws.com/Prod`.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Where the bearer token is persisted. `~` is expanded.
    #[serde(default)]
    pub token_path: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_toast_ttl_secs")]
    pub toast_ttl_secs: u64,
    #[serde(default = "default_assistant_model")]
    pub assistant_model: String,
    #[serde(default = "default_assistant_max_tokens")]
    pub assistant_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: None,
            token_path: None,
            timeout_secs: default_timeout_secs(),
            toast_ttl_secs: default_toast_ttl_secs(),
            assistant_model: default_assistant_model(),
            assistant_max_tokens: default_assistant_max_tokens(),
        }
    }
}

impl Config {
    /// Per-user config directory (`~/.config/clouddocs` on Linux).
    pub fn config_dir() -> Result<PathBuf> {
        ProjectDirs::from("", "", "clouddocs")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| Error::Config("could not determine a home directory".into()))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields defaults; the environment override is applied
    /// afterwards either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir()?.join(CONFIG_FILE),
        };
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            Self::from_toml(&raw)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            config.api_base = Some(base);
        }
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Replace the base URL (CLI flag takes precedence over file and env).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Base URL without a trailing slash.
    pub fn api_base(&self) -> Result<String> {
        match self.api_base.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => Ok(base.trim_end_matches('/').to_string()),
            _ => Err(Error::Config(format!(
                "api_base is not set (config file or {API_BASE_ENV})"
            ))),
        }
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.token_path {
            Some(p) => Ok(PathBuf::from(shellexpand::tilde(p).to_string())),
            None => Ok(Self::config_dir()?.join(TOKEN_FILE)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_ttl_secs)
    }
}
