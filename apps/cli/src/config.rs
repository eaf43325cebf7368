//! CLI configuration.
//!
//! Settings come from an optional TOML file
//! (`$XDG_CONFIG_HOME/cowput/config.toml`, else
//! `~/.config/cowput/config.toml`, or `--config <path>`), then command-line
//! flags override them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use cowput_client::ClientConfig;
use cowput_engine::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::args::Args;

/// Effective CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Block size in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: u64,

    /// Concurrent block uploads per file.
    #[serde(default = "default_parallel")]
    pub parallel: u32,

    /// Retries per block.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub verify: bool,

    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Management tier override.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Storage tier override.
    #[serde(default)]
    pub storage_url: Option<String>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_block_size() -> u64 {
    262_144
}

fn default_parallel() -> u32 {
    4
}

fn default_retry() -> u32 {
    3
}

fn default_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            parallel: default_parallel(),
            retry: default_retry(),
            timeout_secs: default_timeout(),
            verify: false,
            cookie: None,
            password: None,
            api_url: None,
            storage_url: None,
            user_agent: None,
        }
    }
}

impl Config {
    /// Loads `explicit`, or the default file if it exists.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        Self::from_file(&path)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.block_size == 0 {
            bail!("block_size must be positive");
        }
        if self.parallel == 0 {
            bail!("parallel must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be positive");
        }
        Ok(())
    }

    /// Overrides file values with the flags that were given.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(block_size) = args.block_size {
            self.block_size = block_size;
        }
        if let Some(parallel) = args.parallel {
            self.parallel = parallel;
        }
        if let Some(retry) = args.retry {
            self.retry = retry;
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if args.verify {
            self.verify = true;
        }
        if args.cookie.is_some() {
            self.cookie = args.cookie.clone();
        }
        if args.password.is_some() {
            self.password = args.password.clone();
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            api_url: self.api_url.clone().unwrap_or(defaults.api_url),
            storage_url: self.storage_url.clone().unwrap_or(defaults.storage_url),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(self.timeout_secs),
            cookie: self.cookie.clone().filter(|c| !c.is_empty()),
        }
    }

    /// Engine settings, with an oversize block size clamped (and warned
    /// about).
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            block_size: usize::try_from(self.block_size).unwrap_or(usize::MAX),
            parallelism: self.parallel as usize,
            max_retry: self.retry,
            verify_hash: self.verify,
            passcode: self.password.clone(),
        };
        config.clamp_block_size();
        config
    }
}

/// Default configuration file location.
fn config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("cowput").join("config.toml"))
}
