// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Daemon configuration.
//!
//! The configuration is read from JSON. Missing fields take their default value and durations
//! are given in milliseconds:
//!
//! ```json
//! {
//!     "isd_as": "1-ff00:0:110",
//!     "mtu": 1400,
//!     "default_paths_timeout_ms": 10000
//! }
//! ```

use std::{path::Path, time::Duration};

use colibri_proto::address::IsdAsn;
use serde::{Deserialize, Serialize};

/// Errors when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading config file {path}: {source}")]
    Io {
        /// File that could not be read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The content is not valid JSON or does not match the schema.
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The values are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Local ISD-AS.
    pub isd_as: IsdAsn,
    /// MTU of the local AS.
    pub mtu: u16,
    /// Timeout of a paths request without deadline.
    #[serde(rename = "default_paths_timeout_ms", with = "duration_ms")]
    pub default_paths_timeout: Duration,
    /// A background path fetch is started only if the request deadline is at most this far
    /// away.
    #[serde(rename = "background_refresh_window_ms", with = "duration_ms")]
    pub background_refresh_window: Duration,
    /// Timeout of a background path fetch.
    #[serde(rename = "background_timeout_ms", with = "duration_ms")]
    pub background_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            isd_as: IsdAsn::ZERO,
            mtu: 1472,
            default_paths_timeout: Duration::from_secs(10),
            background_refresh_window: Duration::from_secs(5),
            background_timeout: Duration::from_secs(5),
        }
    }
}

impl DaemonConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_paths_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "default_paths_timeout must be greater than zero",
            ));
        }
        if self.background_refresh_window > self.default_paths_timeout {
            return Err(ConfigError::Invalid(
                "background_refresh_window must not exceed default_paths_timeout",
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fill_in_defaults() {
        let config = DaemonConfig::from_json_str(r#"{ "isd_as": "1-ff00:0:110" }"#).unwrap();
        assert_eq!(config.isd_as, "1-ff00:0:110".parse().unwrap());
        assert_eq!(config.mtu, 1472);
        assert_eq!(config.default_paths_timeout, Duration::from_secs(10));
        assert_eq!(config.background_refresh_window, Duration::from_secs(5));
        assert_eq!(config.background_timeout, Duration::from_secs(5));
    }

    #[test]
    fn should_read_durations_in_milliseconds() {
        let config = DaemonConfig::from_json_str(
            r#"{
                "isd_as": "1-ff00:0:110",
                "mtu": 1400,
                "default_paths_timeout_ms": 2500,
                "background_refresh_window_ms": 1000,
                "background_timeout_ms": 750
            }"#,
        )
        .unwrap();
        assert_eq!(config.mtu, 1400);
        assert_eq!(config.default_paths_timeout, Duration::from_millis(2500));
        assert_eq!(config.background_refresh_window, Duration::from_secs(1));
        assert_eq!(config.background_timeout, Duration::from_millis(750));
    }

    #[test]
    fn should_reject_inconsistent_values() {
        let err = DaemonConfig::from_json_str(r#"{ "default_paths_timeout_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DaemonConfig::from_json_str(
            r#"{ "default_paths_timeout_ms": 1000, "background_refresh_window_ms": 2000 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn should_reject_malformed_input() {
        assert!(matches!(
            DaemonConfig::from_json_str(r#"{ "isd_as": "not-an-ia" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DaemonConfig::from_json_str(r#"{ "unknown": 1 }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DaemonConfig::from_json_file("/nonexistent/daemon.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
