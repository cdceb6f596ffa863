//! Configuration management with YAML support

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::remote::{PollPolicy, DEFAULT_HOST};
use crate::store::BuildMode;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

/// Artifact cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

/// Metadata service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Store build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Strict mode aborts the build on any unrecognized unit; lenient mode
    /// stores NULL for the offending cell
    #[serde(default = "default_strict")]
    pub strict: bool,
}

// Default value functions
fn default_cache_dir() -> String {
    "~/.local/share/propchat/cache".to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_attempts() -> u32 {
    600
}

fn default_strict() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            strict: default_strict(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            remote: RemoteConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./propchat.yaml (current directory)
    /// 3. ~/.config/propchat/propchat.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "propchat.yaml".to_string(),
            shellexpand::tilde("~/.config/propchat/propchat.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the cache root, expanding ~ to home directory
    pub fn cache_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.cache.dir).to_string();
        PathBuf::from(expanded)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.remote.poll_interval_ms),
            max_attempts: self.remote.max_poll_attempts,
        }
    }

    pub fn build_mode(&self) -> BuildMode {
        if self.build.strict {
            BuildMode::Strict
        } else {
            BuildMode::NullOnParseFailure
        }
    }
}
