//! Runtime configuration.
//!
//! Configuration is layered with `figment`: compiled-in defaults, then an
//! optional TOML file, then `SHARDWCC_`-prefixed environment variables
//! (`__` separates nested keys, e.g. `SHARDWCC_DRIVER__MAX_ROUNDS=64`).
//!
//! ```toml
//! [parallel]
//! threads = { fixed = 4 }
//! parallel_threshold = 512
//!
//! [driver]
//! max_rounds = 10000
//!
//! [logging]
//! level = "shardwcc_core=debug"
//! ```

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default file name looked up by [`WccConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "shardwcc.toml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "SHARDWCC_";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A provider failed or the merged document did not match the schema.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value was parsed but is not acceptable.
    #[error("invalid value for `{key}`: {message}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// The effective configuration could not be rendered back to TOML.
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Worker thread count for a fragment's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadConfig {
    /// Derive the thread count from the available CPUs.
    #[default]
    Auto,
    /// Use a fixed number of threads.
    Fixed(usize),
}

impl ThreadConfig {
    /// Returns the effective number of threads to use.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        match self {
            ThreadConfig::Auto => {
                let cpus = std::thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(1);
                // Leave 1 core for the driver and transport, minimum 1 thread
                (cpus.saturating_sub(1)).max(1)
            }
            ThreadConfig::Fixed(n) => *n,
        }
    }
}

/// Intra-fragment parallelism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Thread configuration (auto or fixed).
    pub threads: ThreadConfig,
    /// Minimum vertex range length to fork work onto the pool. Smaller
    /// ranges run on the calling thread as worker 0.
    pub parallel_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            threads: ThreadConfig::Auto,
            parallel_threshold: 1024,
        }
    }
}

/// Superstep driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Upper bound on IncEval supersteps after PEval before giving up.
    pub max_rounds: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_rounds: 10_000 }
    }
}

/// Log output settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `shardwcc_core=debug`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit ANSI colour codes.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WccConfig {
    /// Intra-fragment parallelism.
    pub parallel: ParallelConfig,
    /// Superstep driver.
    pub driver: DriverConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl WccConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads defaults, `shardwcc.toml` from the working directory when
    /// present, and `SHARDWCC_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_layered(Some(Path::new(DEFAULT_CONFIG_FILE)), ENV_PREFIX)
    }

    /// Loads defaults overlaid with the given TOML file and environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_layered(Some(path.as_ref()), ENV_PREFIX)
    }

    /// Loads defaults, an optional TOML file and environment variables
    /// carrying `env_prefix`, then validates the result.
    pub fn load_layered(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed(env_prefix).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel.threads == ThreadConfig::Fixed(0) {
            return Err(ConfigError::Invalid {
                key: "parallel.threads",
                message: "fixed thread count must be at least 1".to_string(),
            });
        }
        if self.driver.max_rounds == 0 {
            return Err(ConfigError::Invalid {
                key: "driver.max_rounds",
                message: "must be at least 1".to_string(),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "logging.level",
                message: "filter directive must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Renders the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builder: set thread config.
    #[must_use]
    pub fn with_threads(mut self, threads: ThreadConfig) -> Self {
        self.parallel.threads = threads;
        self
    }

    /// Builder: set fixed thread count.
    #[must_use]
    pub fn with_fixed_threads(mut self, count: usize) -> Self {
        self.parallel.threads = ThreadConfig::Fixed(count);
        self
    }

    /// Builder: set parallel threshold.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel.parallel_threshold = threshold;
        self
    }

    /// Builder: set the superstep bound.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.driver.max_rounds = max_rounds;
        self
    }
}
