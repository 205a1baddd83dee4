//! Search settings loaded from TOML and the environment.
//!
//! ```toml
//! [search]
//! threads = 4
//! error_bound = 0.0
//! seed = 42
//! timeout_ms = 5000
//!
//! [sampling]
//! max_path_length = 32
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::primitives::concurrency::{CancelToken, SearchContext};
use crate::search::ErrorBound;
use crate::types::DejavuError;

/// Environment variable overriding the worker count.
pub const ENV_THREADS: &str = "DEJAVU_THREADS";
/// Environment variable fixing the random seed.
pub const ENV_SEED: &str = "DEJAVU_SEED";
/// Environment variable overriding the default error bound.
pub const ENV_ERROR_BOUND: &str = "DEJAVU_ERROR_BOUND";
/// Environment variable setting a wall-clock budget per search.
pub const ENV_TIMEOUT_MS: &str = "DEJAVU_TIMEOUT_MS";

pub(crate) const DEFAULT_MAX_PATH_LENGTH: usize = 32;

/// Resolved settings for the handle facade.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// Worker threads per search call.
    pub threads: usize,
    /// Default error bound for searches that do not pass one.
    pub error_bound: f64,
    /// Fixed random seed; `None` draws fresh entropy per call.
    pub seed: Option<u64>,
    /// Wall-clock budget per search, enforced by a watchdog.
    pub timeout_ms: Option<u64>,
    /// Path length used when a caller passes none.
    pub default_max_path_length: usize,
    pub(crate) path: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            error_bound: 0.0,
            seed: None,
            timeout_ms: None,
            default_max_path_length: DEFAULT_MAX_PATH_LENGTH,
            path: None,
        }
    }
}

impl SearchConfig {
    /// Loads `explicit`, or the default config file when `None`. A missing file
    /// yields the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let raw = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let mut config = Self::from_raw(raw)?;
        config.path = path;
        Ok(config)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        Self::from_raw(raw)
    }

    /// Overlays the `DEJAVU_*` environment variables.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlays variables read through `lookup`.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_THREADS) {
            self.threads = parse_env(ENV_THREADS, &value)?;
        }
        if let Some(value) = lookup(ENV_SEED) {
            self.seed = Some(parse_env(ENV_SEED, &value)?);
        }
        if let Some(value) = lookup(ENV_ERROR_BOUND) {
            self.error_bound = parse_env(ENV_ERROR_BOUND, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = Some(parse_env(ENV_TIMEOUT_MS, &value)?);
        }
        self.validate()?;
        Ok(self)
    }

    /// Path the settings were loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Validated default error bound.
    pub fn error_bound(&self) -> Result<ErrorBound, ConfigError> {
        ErrorBound::new(self.error_bound).map_err(|_| ConfigError::Invalid {
            key: "search.error_bound",
            value: self.error_bound.to_string(),
        })
    }

    /// Watchdog budget.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Builds a search context sharing `cancel`.
    pub fn context(&self, cancel: CancelToken) -> Result<SearchContext, ConfigError> {
        let ctx = SearchContext::new()
            .with_threads(self.threads)
            .map_err(|_| ConfigError::Invalid {
                key: "search.threads",
                value: self.threads.to_string(),
            })?;
        Ok(ctx.with_cancel(cancel).with_seed(self.seed))
    }

    /// Writes the settings to `target` as TOML.
    pub fn persist(&self, target: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let raw = RawConfig {
            search: SearchSection {
                threads: Some(self.threads),
                error_bound: Some(self.error_bound),
                seed: self.seed,
                timeout_ms: self.timeout_ms,
            },
            sampling: SamplingSection {
                max_path_length: Some(self.default_max_path_length),
            },
        };
        let serialized =
            toml::to_string_pretty(&raw).map_err(|source| ConfigError::Serialize { source })?;
        fs::write(target, serialized).map_err(|source| ConfigError::Write {
            path: target.to_path_buf(),
            source,
        })
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            threads: raw.search.threads.unwrap_or(defaults.threads),
            error_bound: raw.search.error_bound.unwrap_or(defaults.error_bound),
            seed: raw.search.seed,
            timeout_ms: raw.search.timeout_ms,
            default_max_path_length: raw
                .sampling
                .max_path_length
                .unwrap_or(defaults.default_max_path_length),
            path: None,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid {
                key: "search.threads",
                value: "0".into(),
            });
        }
        self.error_bound()?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    search: SearchSection,
    #[serde(default)]
    sampling: SamplingSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SearchSection {
    threads: Option<usize>,
    error_bound: Option<f64>,
    seed: Option<u64>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SamplingSection {
    max_path_length: Option<usize>,
}

/// Failures while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// Settings could not be serialized.
    #[error("failed to serialize config: {source}")]
    Serialize {
        /// Underlying error.
        source: toml::ser::Error,
    },
    /// Settings could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A value is out of range.
    #[error("invalid value '{value}' for {key}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

impl From<ConfigError> for DejavuError {
    fn from(err: ConfigError) -> Self {
        DejavuError::Config(err.to_string())
    }
}

/// `<config dir>/dejavu/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("dejavu").join("config.toml"))
}
