//! Server configuration

use boundary_secrets_engine::{InMemoryStorage, SledStorage, Storage};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Boundary secrets engine API server
#[derive(Parser, Debug, Clone)]
#[command(
    name = "boundary-secrets-server",
    version,
    about = "REST API server for the Boundary secrets engine",
    long_about = None
)]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "BOUNDARY_SECRETS_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8200", env = "BOUNDARY_SECRETS_PORT")]
    pub port: u16,

    /// Directory of a sled database for config and roles; in-memory if unset
    #[arg(long, env = "BOUNDARY_SECRETS_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Timeout in seconds for requests to the Boundary controller (0 disables)
    #[arg(long, default_value = "30", env = "BOUNDARY_SECRETS_REMOTE_TIMEOUT")]
    pub remote_timeout: u64,

    /// Enable JSON logging format
    #[arg(long, env = "BOUNDARY_SECRETS_JSON_LOGS")]
    pub json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn remote_timeout(&self) -> Option<Duration> {
        match self.remote_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Parsed `log_level`, or `None` if it is not a tracing level
    pub fn tracing_level(&self) -> Option<tracing::Level> {
        self.log_level.parse().ok()
    }

    /// Default `EnvFilter` directives. HTTP transport spans are logged at
    /// debug only when the crates themselves log at debug or more verbosely.
    pub fn filter_directives(&self) -> String {
        let level = self.tracing_level().unwrap_or(tracing::Level::INFO);
        let transport = if level >= tracing::Level::DEBUG { "debug" } else { "info" };
        let level = level.to_string().to_lowercase();
        format!(
            "boundary_secrets_api={lvl},boundary_secrets_engine={lvl},tower_http={t}",
            lvl = level,
            t = transport
        )
    }

    /// Open the configured storage backend
    pub fn open_storage(&self) -> boundary_secrets_engine::Result<Arc<dyn Storage>> {
        Ok(match &self.storage_path {
            Some(path) => Arc::new(SledStorage::open(path)?),
            None => Arc::new(InMemoryStorage::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::parse_from(["boundary-secrets-server"]);
        assert_eq!(config.bind_address(), "0.0.0.0:8200");
        assert_eq!(config.remote_timeout(), Some(Duration::from_secs(30)));
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config =
            ServerConfig::parse_from(["boundary-secrets-server", "--remote-timeout", "0", "-p", "9000"]);
        assert_eq!(config.remote_timeout(), None);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_transport_logging_follows_verbosity() {
        let directives = |level: &str| {
            ServerConfig::parse_from(["boundary-secrets-server", "-l", level]).filter_directives()
        };

        for level in ["error", "warn", "info"] {
            let filter = directives(level);
            assert!(filter.contains("tower_http=info"), "{}: {}", level, filter);
            assert!(filter.contains(&format!("boundary_secrets_engine={}", level)));
        }
        for level in ["debug", "trace"] {
            let filter = directives(level);
            assert!(filter.contains("tower_http=debug"), "{}: {}", level, filter);
            assert!(filter.contains(&format!("boundary_secrets_api={}", level)));
        }
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let config = ServerConfig::parse_from(["boundary-secrets-server", "-l", "chatty"]);
        assert!(config.tracing_level().is_none());
        assert_eq!(
            config.filter_directives(),
            "boundary_secrets_api=info,boundary_secrets_engine=info,tower_http=info"
        );
    }
}
