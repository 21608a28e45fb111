//! Configuration for every node and client.
//!
//! Defaults can be overridden by an optional TOML file and then by
//! environment variables (environment wins):
//!
//! - `OMS_BIND_ADDR`             (default: "0.0.0.0")
//! - `OMS_CONNECT_HOST`          (default: "127.0.0.1")
//! - `OMS_MAX_SESSIONS`          (default: "1024")
//! - `OMS_READ_BUFFER`           (default: "2048")
//! - `OMS_READ_ERROR_POLICY`     ("disconnect" | "retry", default: "disconnect")
//! - `OMS_READ_RETRY_BACKOFF_MS` (default: "100")
//! - `OMS_MAX_FRAME_LEN`         (default: "65536")
//! - `OMS_SENDER_ID`             (default: unset)
//! - `OMS_VERIFY_CHECKSUMS`      (default: "false")
//! - `OMS_CONNECT_ATTEMPTS`      (default: "5")
//! - `OMS_CONNECT_RETRY_MS`      (default: "500")

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use oms_protocol::frame::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::EndpointSettings;

/// Default ports of the three server roles.
pub const DEFAULT_ROUTER_PORT: u16 = 8080;
pub const DEFAULT_VENUE_PORT: u16 = 8081;
pub const DEFAULT_STORE_PORT: u16 = 8082;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidEnv {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

/// What a session reader does when a read fails (other than EOF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadErrorPolicy {
    /// Tear the session down.
    #[default]
    Disconnect,

    /// Log, back off and keep reading.
    Retry,
}

impl FromStr for ReadErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disconnect" => Ok(ReadErrorPolicy::Disconnect),
            "retry" => Ok(ReadErrorPolicy::Retry),
            other => Err(format!("expected \"disconnect\" or \"retry\", got {other:?}")),
        }
    }
}

impl fmt::Display for ReadErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadErrorPolicy::Disconnect => f.write_str("disconnect"),
            ReadErrorPolicy::Retry => f.write_str("retry"),
        }
    }
}

/// Node / client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Interface listeners bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// Host outbound connections go to.
    pub connect_host: String,

    /// Maximum number of simultaneously accepted sessions.
    pub max_sessions: usize,

    /// Size of each session's read buffer.
    pub read_buffer_size: usize,

    pub read_error_policy: ReadErrorPolicy,
    pub read_retry_backoff_ms: u64,

    /// Largest unterminated frame buffered per session.
    pub max_frame_len: usize,

    /// Stamped as SenderSubID (50) on every outgoing message.
    pub sender_id: Option<String>,

    /// Drop inbound frames whose CheckSum (10) does not match.
    pub verify_checksums: bool,

    /// Startup wiring: attempts per peer and delay between them.
    pub connect_attempts: u32,
    pub connect_retry_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            connect_host: "127.0.0.1".to_string(),
            max_sessions: 1024,
            read_buffer_size: 2048,
            read_error_policy: ReadErrorPolicy::Disconnect,
            read_retry_backoff_ms: 100,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            sender_id: None,
            verify_checksums: false,
            connect_attempts: 5,
            connect_retry_ms: 500,
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::default().with_env_overrides()
    }

    /// Optional TOML file, then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        base.with_env_overrides()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }

    /// Parse TOML text; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: "<inline>".to_string(),
            source,
        })
    }

    /// Apply `OMS_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let sender_id = match env::var("OMS_SENDER_ID") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => self.sender_id,
        };

        Ok(Config {
            bind_addr: read_env_or_default("OMS_BIND_ADDR", self.bind_addr)?,
            connect_host: read_env_or_default("OMS_CONNECT_HOST", self.connect_host)?,
            max_sessions: read_env_or_default("OMS_MAX_SESSIONS", self.max_sessions)?,
            read_buffer_size: read_env_or_default("OMS_READ_BUFFER", self.read_buffer_size)?,
            read_error_policy: read_env_or_default(
                "OMS_READ_ERROR_POLICY",
                self.read_error_policy,
            )?,
            read_retry_backoff_ms: read_env_or_default(
                "OMS_READ_RETRY_BACKOFF_MS",
                self.read_retry_backoff_ms,
            )?,
            max_frame_len: read_env_or_default("OMS_MAX_FRAME_LEN", self.max_frame_len)?,
            sender_id,
            verify_checksums: read_env_or_default("OMS_VERIFY_CHECKSUMS", self.verify_checksums)?,
            connect_attempts: read_env_or_default("OMS_CONNECT_ATTEMPTS", self.connect_attempts)?,
            connect_retry_ms: read_env_or_default("OMS_CONNECT_RETRY_MS", self.connect_retry_ms)?,
        })
    }

    /// Convenience: `bind_addr:port` socket string.
    pub fn socket_addr_string(&self, port: u16) -> String {
        format!("{}:{}", self.bind_addr, port)
    }

    pub fn read_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.read_retry_backoff_ms)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }

    /// The protocol-endpoint part of the configuration.
    pub fn endpoint_settings(&self) -> EndpointSettings {
        EndpointSettings {
            sender_id: self.sender_id.clone(),
            verify_checksums: self.verify_checksums,
            max_frame_len: self.max_frame_len,
        }
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: val.clone(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
