//! Command-line flags.
//!
//! Every flag is optional so that only values the operator actually supplied
//! override the TOML file; unset flags fall through to the file, then to the
//! built-in defaults in [`ServerConfig`].

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{finalize, load_config_file, ConfigError};
use crate::config::schema::{LogFormat, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "gothere")]
#[command(about = "Redirects request paths to destinations listed in a mapping file", long_about = None)]
pub struct Cli {
    /// Listening port [default: 80]
    #[arg(long, env = "GOTHERE_PORT")]
    pub port: Option<u16>,

    /// Redirect target for unmatched paths; empty answers 404 instead [default: http://google.com]
    #[arg(long = "defaultUrl", env = "GOTHERE_DEFAULT_URL")]
    pub default_url: Option<String>,

    /// Interface to bind [default: 0.0.0.0]
    #[arg(long, env = "GOTHERE_BIND")]
    pub bind: Option<IpAddr>,

    /// Mapping file [default: urls.txt]
    #[arg(long, env = "GOTHERE_MAPPINGS")]
    pub mappings: Option<PathBuf>,

    /// Per-request timeout in seconds [default: 10]
    #[arg(long, env = "GOTHERE_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Drain period for in-flight requests on shutdown, in seconds [default: 30]
    #[arg(long, env = "GOTHERE_GRACE_PERIOD_SECS")]
    pub grace_period_secs: Option<u64>,

    /// Also reload when the mapping file changes on disk
    #[arg(long, env = "GOTHERE_WATCH")]
    pub watch: bool,

    /// Log output format [default: pretty]
    #[arg(long, value_enum, env = "GOTHERE_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "GOTHERE_METRICS_ADDRESS")]
    pub metrics_address: Option<SocketAddr>,

    /// TOML file supplying any of the settings above
    #[arg(long, env = "GOTHERE_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Merge file, environment and flags into a validated configuration.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => load_config_file(path)?,
            None => ServerConfig::default(),
        };
        finalize(self.apply(base))
    }

    fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(bind) = self.bind {
            config.listener.bind = bind;
        }
        if let Some(default_url) = self.default_url {
            config.default_url = default_url;
        }
        if let Some(path) = self.mappings {
            config.mappings_path = path;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.timeouts.request_secs = secs;
        }
        if let Some(secs) = self.grace_period_secs {
            config.timeouts.shutdown_grace_secs = secs;
        }
        if self.watch {
            config.watch_mappings = true;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if self.metrics_address.is_some() {
            config.metrics.address = self.metrics_address;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gothere").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn port_and_default_url_flags() {
        let config = parse(&["--port", "8080", "--defaultUrl", "http://fallback.test"])
            .into_config()
            .unwrap();
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.default_url, "http://fallback.test");
    }

    #[test]
    fn empty_default_url_is_kept() {
        let config = parse(&["--defaultUrl", ""]).into_config().unwrap();
        assert_eq!(config.default_destination(), None);
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_url = \"http://file.test\"\n[listener]\nport = 9000").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["--config", path.as_str(), "--port", "9001"]).into_config().unwrap();
        assert_eq!(config.listener.port, 9001);
        assert_eq!(config.default_url, "http://file.test");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = parse(&["--grace-period-secs", "0"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
