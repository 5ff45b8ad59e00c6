use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

/// Register transaction timing.
///
/// A chunk waits up to `poll_interval * max_polls` for its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Pause between checks of the response staging area.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
    /// Checks per chunk before giving up on it.
    pub max_polls: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            max_polls: 20,
        }
    }
}

impl TransactionConfig {
    /// Longest time a single chunk can wait.
    pub fn chunk_timeout(&self) -> Duration {
        self.poll_interval * self.max_polls
    }
}

/// Connection settings for a sensor.
///
/// Loadable from JSON; every field is optional and durations are given in
/// milliseconds:
///
/// ```json
/// { "port": "/dev/ttyUSB0", "baud_rate": 9600, "transaction": { "max_polls": 40 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port path.
    pub port: String,
    pub baud_rate: u32,
    /// Serial read timeout.
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
    /// Receive loop sleep when no bytes are waiting.
    #[serde(rename = "idle_sleep_ms", with = "millis")]
    pub idle_sleep: Duration,
    pub transaction: TransactionConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(50),
            idle_sleep: Duration::from_millis(5),
            transaction: TransactionConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Default settings for `port` at `baud_rate`.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Load settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_err = |source: std::io::Error| DeviceError::Config {
            path: path.to_path_buf(),
            source,
        };
        let text = std::fs::read_to_string(path).map_err(config_err)?;
        serde_json::from_str(&text).map_err(|e| config_err(e.into()))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
