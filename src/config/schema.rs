//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the redirect
//! service. All types derive Serde traits so an optional TOML file can supply
//! any subset of fields; missing fields fall back to their defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fallback destination used when none is configured.
pub const DEFAULT_DESTINATION: &str = "http://google.com";

/// Mapping file read at startup and on every reload.
pub const DEFAULT_MAPPINGS_PATH: &str = "urls.txt";

/// Root configuration for the redirect service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, port).
    pub listener: ListenerConfig,

    /// Location of the mapping source.
    pub mappings_path: PathBuf,

    /// Redirect target for unmatched paths. Empty disables the fallback.
    pub default_url: String,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Reload the mapping file when it changes on disk.
    pub watch_mappings: bool,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Metrics settings.
    pub metrics: MetricsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            mappings_path: PathBuf::from(DEFAULT_MAPPINGS_PATH),
            default_url: DEFAULT_DESTINATION.to_string(),
            timeouts: TimeoutConfig::default(),
            watch_mappings: false,
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// The fallback destination, or `None` when the fallback is disabled.
    pub fn default_destination(&self) -> Option<&str> {
        if self.default_url.is_empty() {
            None
        } else {
            Some(&self.default_url)
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub bind: IpAddr,

    /// TCP port. Zero asks the OS for an ephemeral port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 80,
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Timeout configuration for request handling and shutdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on handling a single request, in seconds.
    pub request_secs: u64,

    /// How long in-flight requests may drain after a shutdown trigger, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 10,
            shutdown_grace_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines for terminals.
    #[default]
    Pretty,
    /// One JSON object per line for log aggregation.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub filter: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "gothere=info,tower_http=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus scrape endpoint. `None` leaves the exporter uninstalled.
    pub address: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_contract() {
        let config = ServerConfig::default();
        assert_eq!(config.listener.port, 80);
        assert_eq!(config.default_url, "http://google.com");
        assert_eq!(config.mappings_path, PathBuf::from("urls.txt"));
        assert_eq!(config.timeouts.request(), Duration::from_secs(10));
    }

    #[test]
    fn empty_default_url_disables_fallback() {
        let mut config = ServerConfig::default();
        assert_eq!(config.default_destination(), Some("http://google.com"));

        config.default_url.clear();
        assert_eq!(config.default_destination(), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            default_url = ""

            [listener]
            port = 8080

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.listener.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.default_destination(), None);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.timeouts.shutdown_grace_secs, 30);
    }
}
