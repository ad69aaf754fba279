//! Feed Configuration Settings
//!
//! Configuration types for the feed handler, loaded from environment
//! variables. Loading goes through [`FeedConfig::from_lookup`] so the parsing
//! rules can be exercised without touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

/// Default handshake command sent right after connect.
pub const DEFAULT_HANDSHAKE: &str = "SUBSCRIBE ALL\n";

/// Text encoding of the feed's byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedEncoding {
    /// UTF-8.
    Utf8,
    /// ISO-8859-9 (Turkish extended ASCII).
    #[default]
    Latin5,
}

impl FeedEncoding {
    /// Parse an encoding name. Returns `None` for unsupported names.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "utf8" | "utf-8" => Some(Self::Utf8),
            "latin5" | "iso-8859-9" | "iso8859-9" | "windows-1254" => Some(Self::Latin5),
            _ => None,
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Latin5 => "latin5",
        }
    }
}

/// Feed endpoint settings.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    /// Feed host name or address.
    pub host: String,
    /// Feed TCP port.
    pub port: u16,
    /// Literal command sent immediately after connect.
    pub handshake: String,
    /// Text encoding of received bytes.
    pub encoding: FeedEncoding,
    /// Size of the reusable receive buffer.
    pub receive_buffer_bytes: usize,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

impl EndpointSettings {
    /// Settings for `host:port` with every other value at its default.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            handshake: DEFAULT_HANDSHAKE.to_string(),
            encoding: FeedEncoding::default(),
            receive_buffer_bytes: 65_536,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// `host:port` string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Worker queue settings.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    /// Drain pending items on shutdown (`true`) or discard them (`false`).
    pub drain_on_shutdown: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            drain_on_shutdown: true,
        }
    }
}

/// Event channel settings.
#[derive(Debug, Clone, Copy)]
pub struct EventSettings {
    /// Capacity of each broadcast channel.
    pub capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

/// Server port settings.
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    /// Health and query HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete feed handler configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed endpoint.
    pub endpoint: EndpointSettings,
    /// Worker queue settings.
    pub workers: WorkerSettings,
    /// Event channel settings.
    pub events: EventSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Optional JSON-lines reference-data file.
    pub reference_data_path: Option<PathBuf>,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing,
    /// empty or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required values are missing, empty or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = required(&lookup, "FEED_HOST")?;
        let port_raw = required(&lookup, "FEED_PORT")?;
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "FEED_PORT".to_string(),
                value: port_raw.clone(),
            })?;

        let mut endpoint = EndpointSettings::new(host, port);

        if let Some(handshake) = lookup("FEED_HANDSHAKE").filter(|v| !v.is_empty()) {
            endpoint.handshake = unescape_handshake(&handshake);
        }

        if let Some(raw) = lookup("FEED_ENCODING") {
            endpoint.encoding = FeedEncoding::from_str_case_insensitive(&raw).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: "FEED_ENCODING".to_string(),
                    value: raw.clone(),
                }
            })?;
        }

        endpoint.receive_buffer_bytes = parse_or(
            &lookup,
            "FEED_RECEIVE_BUFFER_BYTES",
            endpoint.receive_buffer_bytes,
        )
        .max(1);
        endpoint.connect_timeout = lookup("FEED_CONNECT_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(endpoint.connect_timeout, Duration::from_secs);

        let workers = WorkerSettings {
            drain_on_shutdown: lookup("FEED_DRAIN_ON_SHUTDOWN")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(WorkerSettings::default().drain_on_shutdown),
        };

        let events = EventSettings {
            capacity: parse_or(
                &lookup,
                "FEED_EVENTS_CAPACITY",
                EventSettings::default().capacity,
            )
            .max(1),
        };

        let server = ServerSettings {
            health_port: parse_or(
                &lookup,
                "FEED_HEALTH_PORT",
                ServerSettings::default().health_port,
            ),
        };

        let reference_data_path = lookup("FEED_REFERENCE_DATA_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            endpoint,
            workers,
            events,
            server,
            reference_data_path,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand `\n`, `\r` and `\t` escapes so a handshake can be set from a
/// single-line environment value.
fn unescape_handshake(raw: &str) -> String {
    raw.replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}
