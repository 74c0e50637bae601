//! Configuration loading and constants.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! the `PORT` and `HOST` environment variables. `AppConfig` is the root
//! configuration struct.

use const_format::formatcp;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

// =============================================================================
// Network Defaults
// =============================================================================
// DEFAULT_PORT is also the default `containerPort` of a deployment descriptor.
// The two must agree or the orchestrator routes traffic to a closed port.

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind host (all IPv4 interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind address, for help text
pub const DEFAULT_BIND_ADDR: &str = formatcp!("{}:{}", DEFAULT_HOST, DEFAULT_PORT);

// =============================================================================
// Request Handling Limits
// =============================================================================

/// Upper bound on handler time before a 408 is returned
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Connections that have not sent a complete request head by then are closed
pub const DEFAULT_HEADER_READ_TIMEOUT_SECS: u64 = 10;

/// How long in-flight connections may drain after SIGTERM/SIGINT
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Largest accepted request body (64 KiB); larger bodies get a 413
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// Response Headers
// =============================================================================

/// Health checkers and load balancers must never see a cached answer
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// Default Strings
// =============================================================================

/// Body returned for `GET /`
pub const GREETING: &str = "Hello World";

/// Environment variable overriding `http.port`
pub const ENV_PORT: &str = "PORT";

/// Environment variable overriding `http.host`
pub const ENV_HOST: &str = "HOST";

/// Default log filter when neither --log-level nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "hello_service=info,tower_http=info";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Deployment coupling checks
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Handler timeout in seconds
    #[serde(default = "HttpServerConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Time a client gets to send its request line and headers, in seconds
    #[serde(default = "HttpServerConfig::default_header_read_timeout")]
    pub header_read_timeout_seconds: u64,
    /// Connection drain window on shutdown, in seconds
    #[serde(default = "HttpServerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    #[serde(default = "HttpServerConfig::default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_seconds: Self::default_request_timeout(),
            header_read_timeout_seconds: Self::default_header_read_timeout(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
            max_body_bytes: Self::default_max_body_bytes(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HOST.to_string()
    }
    fn default_port() -> u16 {
        DEFAULT_PORT
    }
    fn default_request_timeout() -> u64 {
        DEFAULT_REQUEST_TIMEOUT_SECS
    }
    fn default_header_read_timeout() -> u64 {
        DEFAULT_HEADER_READ_TIMEOUT_SECS
    }
    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }
    fn default_max_body_bytes() -> usize {
        DEFAULT_MAX_BODY_BYTES
    }

    /// Resolve host and port into a socket address.
    ///
    /// The host must be a literal IPv4 or IPv6 address; name resolution is
    /// left to the orchestrator.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: Self::default_format(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> LogFormat {
        LogFormat::Text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Optional link to the deployment descriptor this process is deployed with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentConfig {
    /// When set, startup refuses to bind unless the descriptor's
    /// `containerPort` equals `http.port`.
    pub descriptor: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply `PORT` and
    /// `HOST` from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.http.bind_addr()?;
        Ok(config)
    }

    /// Read a TOML file. A relative `deployment.descriptor` is taken relative
    /// to the file's directory, not the working directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_toml(&std::fs::read_to_string(path)?)?;
        if let (Some(descriptor), Some(dir)) = (&config.deployment.descriptor, path.parent()) {
            if descriptor.is_relative() {
                config.deployment.descriptor = Some(dir.join(descriptor));
            }
        }
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Override file settings with environment values.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PORT) {
            self.http.port = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_PORT,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_HOST) {
            let host = raw.trim();
            if host.is_empty() {
                return Err(ConfigError::InvalidEnv {
                    var: ENV_HOST,
                    value: raw.clone(),
                });
            }
            self.http.host = host.to_string();
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("Invalid http.host {0:?}: expected an IP address")]
    InvalidHost(String),
}
