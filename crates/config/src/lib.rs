#![deny(
    trivial_numeric_casts,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    unused_results
)]
#![warn(rust_2021_compatibility, unreachable_pub)]

//! Configuration for the log-routing daemon: sources, destinations, and the
//! limits governing how aggressively streams are flushed and evicted.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;
use tracing::debug;
use validator::Validate;

/// Errors loading or validating a configuration file.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The config file could not be read or parsed.
    #[error("invalid configuration file `{file}` - {message}")]
    InvalidConfig {
        /// The path to the config file.
        file: String,
        /// The error message.
        message: String,
    },

    /// A `stream_limits` field was out of its allowed range.
    #[error("invalid configuration file `{file}` - {message}")]
    InvalidLimits {
        /// The path to the config file.
        file: String,
        /// The validation failure message.
        message: String,
    },

    /// A pipeline referenced a source or destination name with no matching
    /// entry in the `sources`/`destinations` maps.
    #[error("unknown {kind} `{name}` referenced (config file `{file}`)")]
    UnknownReference {
        /// The path to the config file.
        file: String,
        /// `"source"` or `"destination"`.
        kind: &'static str,
        /// The referenced name.
        name: String,
    },
}

/// Thresholds governing when a buffered stream is flushed, mirroring
/// [`store::StreamLimits`] but expressed as plain numbers/seconds so the
/// YAML schema has no crate-specific types.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct StreamLimitsConfig {
    /// Flush once the buffered message count reaches this value.
    #[serde(default = "default_max_count")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub max_count: usize,

    /// Flush once the buffered byte total reaches this value.
    #[serde(default = "default_max_bytes")]
    #[validate(range(min = 1, max = 1_073_741_824))]
    pub max_bytes: usize,

    /// Flush once this many seconds have elapsed since the last flush.
    #[serde(default = "default_max_time_secs")]
    #[validate(range(min = 1, max = 86_400))]
    pub max_time_secs: i64,
}

impl Default for StreamLimitsConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            max_bytes: default_max_bytes(),
            max_time_secs: default_max_time_secs(),
        }
    }
}

fn default_max_count() -> usize {
    10_000
}

fn default_max_bytes() -> usize {
    1_000_000
}

fn default_max_time_secs() -> i64 {
    5
}

fn default_cache_timeout_secs() -> i64 {
    300
}

/// Top-level daemon configuration, as loaded from YAML.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct Config {
    /// Overrides the local hostname used to fill in `event.info.host` when
    /// a reader doesn't set one. Empty means "ask the OS".
    #[serde(default)]
    pub hostname: String,

    /// How long an idle, empty stream or group may sit in the store before
    /// it is evicted, in seconds.
    #[serde(default = "default_cache_timeout_secs")]
    #[validate(range(min = 1, max = 86_400))]
    pub cache_timeout_secs: i64,

    /// Default flush thresholds, applied to every stream unless overridden.
    #[serde(default)]
    #[validate]
    pub stream_limits: StreamLimitsConfig,

    /// Configured sources, keyed by name (e.g. `"stdin"`, `"journal"`).
    /// Values are backend-specific and opaque to this crate.
    #[serde(default)]
    pub sources: HashMap<String, Value>,

    /// Configured destinations, keyed by name (e.g. `"syslog"`,
    /// `"loggly"`, `"datadog"`). Values are backend-specific and opaque to
    /// this crate.
    #[serde(default)]
    pub destinations: HashMap<String, Value>,
}

impl Config {
    /// Loads and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file_name = path.as_ref().display().to_string();
        debug!(file = %file_name, "loading configuration");

        let file = File::open(path.as_ref()).map_err(|err| Error::InvalidConfig {
            file: file_name.clone(),
            message: err.to_string(),
        })?;
        let reader = BufReader::new(file);
        let config: Config = serde_yaml::from_reader(reader).map_err(|err| Error::InvalidConfig {
            file: file_name.clone(),
            message: err.to_string(),
        })?;

        config.validate().map_err(|err| Error::InvalidLimits { file: file_name.clone(), message: err.to_string() })?;

        debug!(file = %file_name, "configuration loaded");
        Ok(config)
    }

    /// Validates that `names` are all present in `sources`, for CLI
    /// overrides (`--src`) that narrow the active source set.
    pub fn check_sources(&self, file: &str, names: &[String]) -> Result<(), Error> {
        Self::check_references(file, "source", names, &self.sources)
    }

    /// Validates that `names` are all present in `destinations`, for CLI
    /// overrides (`--dst`).
    pub fn check_destinations(&self, file: &str, names: &[String]) -> Result<(), Error> {
        Self::check_references(file, "destination", names, &self.destinations)
    }

    fn check_references(file: &str, kind: &'static str, names: &[String], table: &HashMap<String, Value>) -> Result<(), Error> {
        for name in names {
            if !table.contains_key(name) {
                return Err(Error::UnknownReference { file: file.to_string(), kind, name: name.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_config() {
        let config = Config::load("data/config.yaml").expect("fixture should load");

        assert_eq!(config.hostname, "");
        assert_eq!(config.cache_timeout_secs, 900);
        assert_eq!(config.stream_limits.max_count, 500);
        assert_eq!(config.stream_limits.max_bytes, 32_000);
        assert_eq!(config.stream_limits.max_time_secs, 5);

        assert!(config.sources.contains_key("stdin"));
        assert!(config.destinations.contains_key("syslog"));
        assert!(config.destinations.contains_key("loggly"));
    }

    #[test]
    fn check_sources_rejects_unknown_names() {
        let config = Config::load("data/config.yaml").unwrap();
        assert!(config.check_sources("data/config.yaml", &["stdin".to_string()]).is_ok());
        assert!(matches!(
            config.check_sources("data/config.yaml", &["nope".to_string()]),
            Err(Error::UnknownReference { .. })
        ));
    }

    #[test]
    fn out_of_range_limit_is_rejected() {
        let yaml = "stream_limits:\n  max_count: 0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_apply_when_keys_are_absent() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.cache_timeout_secs, 300);
        assert_eq!(config.stream_limits.max_count, 10_000);
        assert_eq!(config.stream_limits.max_bytes, 1_000_000);
    }
}
