//! Bot configuration: named execution backends plus pipeline tunables.
//!
//! Loaded from a TOML file; the path comes from `CODEBOT_CONFIG` or
//! defaults to `codebot.toml` in the working directory.
//!
//! ```toml
//! current_api = "piston"
//! protected_channels = ["github-mirror"]
//! bot_user_id = "12345"
//!
//! [backends.piston]
//! kind = "piston"
//! url = "https://emkc.org/api/v2/piston"
//! compilers = { java = "java", python = "python" }
//!
//! [backends.wandbox]
//! kind = "wandbox"
//! url = "https://wandbox.org/api/compile.json"
//! compilers = { java = "openjdk-head", "c++" = "gcc-head" }
//! ```

use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::backend::piston::PistonBackend;
use crate::backend::registry::BackendRegistry;
use crate::backend::wandbox::WandboxBackend;
use crate::backend::ExecutionBackend;
use crate::cache::DEFAULT_CAPACITY;
use crate::gateway::{ChannelId, UserId};
use crate::pipeline::PipelineConfig;
use crate::render::DEFAULT_CHAR_LIMIT;

const ENV_CONFIG_PATH: &str = "CODEBOT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "codebot.toml";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which wire protocol a configured backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Piston,
    Wandbox,
}

/// One named backend entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendEntry {
    pub kind: BackendKind,
    pub url: String,
    /// Language tag → compiler/runtime id. For piston this seeds the
    /// catalog until the first `refresh_catalog`; for wandbox it is the
    /// whole catalog.
    #[serde(default)]
    pub compilers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub backends: HashMap<String, BackendEntry>,
    /// Name of the initially active backend.
    pub current_api: String,
    /// Channels where 🗑️ must not delete bot messages.
    #[serde(default)]
    pub protected_channels: Vec<String>,
    /// The bot's own user id on the chat platform.
    #[serde(default)]
    pub bot_user_id: String,
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_max_concurrent_compiles")]
    pub max_concurrent_compiles: usize,
}

fn default_char_limit() -> usize {
    DEFAULT_CHAR_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_concurrent_compiles() -> usize {
    4
}

impl BotConfig {
    /// Load from the path in `CODEBOT_CONFIG`, or `codebot.toml`.
    pub fn from_env() -> Result<Self> {
        let path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate cross-field constraints; returns an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.backends.is_empty() {
            return Err("at least one backend must be configured".to_string());
        }
        if !self.backends.contains_key(&self.current_api) {
            return Err(format!(
                "current_api {:?} is not a configured backend",
                self.current_api
            ));
        }
        if self.char_limit == 0 {
            return Err("char_limit must be > 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Construct the configured backends and wrap them in a registry.
    pub fn build_registry(&self) -> Result<BackendRegistry> {
        let timeout = Duration::from_secs(self.request_timeout_secs);
        let mut backends: HashMap<String, Arc<dyn ExecutionBackend>> = HashMap::new();

        for (name, entry) in &self.backends {
            let backend: Arc<dyn ExecutionBackend> = match entry.kind {
                BackendKind::Piston => Arc::new(
                    PistonBackend::new(name.as_str(), &entry.url, entry.compilers.clone(), timeout)
                        .with_context(|| format!("building piston backend {name}"))?,
                ),
                BackendKind::Wandbox => Arc::new(
                    WandboxBackend::new(name.as_str(), &entry.url, entry.compilers.clone(), timeout)
                        .with_context(|| format!("building wandbox backend {name}"))?,
                ),
            };
            backends.insert(name.clone(), backend);
        }

        BackendRegistry::new(backends, &self.current_api).map_err(anyhow::Error::from)
    }

    /// The pipeline-facing slice of this config.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            char_limit: self.char_limit,
            protected_channels: self
                .protected_channels
                .iter()
                .map(|c| ChannelId::new(c.clone()))
                .collect::<HashSet<_>>(),
            bot_user: UserId::new(self.bot_user_id.clone()),
            max_concurrent_compiles: self.max_concurrent_compiles,
        }
    }
}
