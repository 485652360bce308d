//! Configuration management
//!
//! This module handles loading, saving, and migrating the bucket-mirror
//! configuration file. The file is stored in TOML format at
//! `<config dir>/bucket-mirror/config.toml`, or under `$BM_CONFIG_DIR` when set.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::download::DEFAULT_CONCURRENCY;
use crate::error::{Error, Result};
use crate::profile::Profile;

/// Current configuration schema version
///
/// Bumping this version requires a migration in [`ConfigManager::migrate`].
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "BM_CONFIG_DIR";

/// Default download folder, before variable substitution
const DEFAULT_FOLDER: &str = "${HOME}/bucket-mirror/download";

/// Default grace period for outstanding downloads on shutdown
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 60;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Download settings
    #[serde(default)]
    pub download: DownloadSettings,

    /// Configured bucket profiles
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Settings shared by every download issued through a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Root download folder; `${VAR}` is replaced from the environment
    #[serde(default = "default_folder")]
    pub folder: String,

    /// Number of objects downloaded concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum number of scheduled but unfinished downloads (unbounded when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_limit: Option<usize>,

    /// Keys requested per listing page (server default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,

    /// Seconds to wait for outstanding downloads when a session closes
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_folder() -> String {
    DEFAULT_FOLDER.to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_shutdown_grace() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            concurrency: default_concurrency(),
            queue_limit: None,
            page_size: None,
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl DownloadSettings {
    /// Download folder with environment variables substituted
    pub fn resolved_folder(&self) -> PathBuf {
        PathBuf::from(expand_vars(&self.folder, lookup_var))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            download: DownloadSettings::default(),
            profiles: Vec::new(),
        }
    }
}

fn lookup_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => Some(value),
        Err(_) if name == "HOME" => dirs::home_dir().map(|p| p.to_string_lossy().into_owned()),
        Err(_) => None,
    }
}

/// Replace every `${NAME}` in `input` using `lookup`
///
/// Unknown variables and unterminated references are left as written.
pub fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => output.push_str(&value),
                    None => output.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("bucket-mirror"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            tracing::debug!(
                "No configuration at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade bmirror.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        if config.download.concurrency == 0 {
            return Err(Error::Config("download.concurrency must be at least 1".into()));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        // Profiles may carry secret keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        tracing::info!(
            "Migrating configuration from schema {} to {}",
            config.schema_version,
            SCHEMA_VERSION
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}
