use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use fairturn_api::IdScheme;

use crate::error::ConfigError;

pub const DEFAULT_POOL_SIZE: usize = 99;
pub const DEFAULT_TURN_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "fairturn-worker";

// --- Pool Configuration ---

/// Configuration for a pool run.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of workers (actors) in the pool.
    pub pool_size: usize,

    /// Pause each worker takes after releasing its turn.
    pub turn_delay: Duration,

    /// How long to wait for every worker to report ready before the
    /// starting gate is released.
    pub ready_timeout: Duration,

    /// Upper bound on `await_drained`; `None` waits for as long as it takes.
    pub drain_timeout: Option<Duration>,

    /// How actor ids are produced.
    pub id_scheme: IdScheme,

    /// Prefix for worker thread names.
    pub thread_name_prefix: String,

    /// Emit a debug event for every granted and released turn.
    pub enable_detailed_logging: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            turn_delay: DEFAULT_TURN_DELAY,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            drain_timeout: None,
            id_scheme: IdScheme::Uuid,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            enable_detailed_logging: false,
        }
    }
}

impl PoolConfig {
    pub fn new(pool_size: usize, turn_delay: Duration) -> Self {
        Self {
            pool_size,
            turn_delay,
            ..Default::default()
        }
    }

    /// Load a JSON overlay from `path` and merge it onto the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let overlay: PoolConfigFile = serde_json::from_str(raw)?;
        let config = Self::default().merge_with_file(&overlay);
        config.validate()?;
        Ok(config)
    }

    /// Merge file settings onto this configuration.
    /// Fields the file leaves out keep their current values.
    pub fn merge_with_file(&self, file: &PoolConfigFile) -> PoolConfig {
        PoolConfig {
            pool_size: file.pool_size.unwrap_or(self.pool_size),
            turn_delay: file
                .turn_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.turn_delay),
            ready_timeout: file
                .ready_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(self.ready_timeout),
            drain_timeout: file
                .drain_timeout_ms
                .map(Duration::from_millis)
                .or(self.drain_timeout),
            id_scheme: file.id_scheme.clone().unwrap_or_else(|| self.id_scheme.clone()),
            thread_name_prefix: file
                .thread_name_prefix
                .clone()
                .unwrap_or_else(|| self.thread_name_prefix.clone()),
            enable_detailed_logging: file
                .enable_detailed_logging
                .unwrap_or(self.enable_detailed_logging),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".to_string()));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::Invalid("thread_name_prefix must not be empty".to_string()));
        }
        if let IdScheme::Sequential { prefix } = &self.id_scheme {
            if prefix.is_empty() {
                return Err(ConfigError::Invalid("sequential id prefix must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

// --- File Overlay ---

/// On-disk configuration; every field is optional and overrides the
/// corresponding `PoolConfig` default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfigFile {
    pub pool_size: Option<usize>,
    pub turn_delay_ms: Option<u64>,
    pub ready_timeout_ms: Option<u64>,
    pub drain_timeout_ms: Option<u64>,
    pub id_scheme: Option<IdScheme>,
    pub thread_name_prefix: Option<String>,
    pub enable_detailed_logging: Option<bool>,
}
