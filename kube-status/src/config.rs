//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: KUBE_STATUS_, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/kube-status/config.toml
//! 4. System directory: /etc/kube-status/config.toml
//! 5. Default values
//!
//! Local health/readiness checks are code, not data, and are supplied to
//! [`ServiceBuilder`](crate::service_builder::ServiceBuilder) separately.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "KUBE_STATUS_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Dependency probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, used in logs only
    #[serde(default = "default_name")]
    pub name: String,

    /// Hostname to bind; empty binds all interfaces
    #[serde(default)]
    pub hostname: String,

    /// Port to listen on (0 picks an ephemeral port)
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long `start` waits for the serving loop to fail before self-checking
    #[serde(default = "default_start_wait_ms")]
    pub start_wait_ms: u64,

    /// Fixed instance UUID; a random one is generated when unset
    #[serde(default)]
    pub uuid: Option<Uuid>,

    /// Base addresses (including scheme) of services this one depends on
    ///
    /// Their `/readiness` endpoints are queried on every readiness check,
    /// forwarding the identifier chain with this instance's UUID appended.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            hostname: String::new(),
            port: default_port(),
            start_wait_ms: default_start_wait_ms(),
            uuid: None,
            dependencies: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl ServiceConfig {
    /// Get the start wait as Duration
    pub fn start_wait(&self) -> Duration {
        Duration::from_millis(self.start_wait_ms)
    }

    /// Address the serving loop binds, e.g. `0.0.0.0:8080` or `localhost:9050`
    pub fn bind_addr(&self) -> String {
        let host = if self.hostname.is_empty() {
            "0.0.0.0"
        } else {
            self.hostname.as_str()
        };
        format!("{}:{}", host, self.port)
    }

    /// HTTP URL of this service; an empty hostname becomes `localhost`
    pub fn url(&self) -> String {
        let host = if self.hostname.is_empty() {
            "localhost"
        } else {
            self.hostname.as_str()
        };
        format!("http://{}:{}", host, self.port)
    }
}

/// Dependency probe configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe every dependency instead of stopping at the first failure
    #[serde(default)]
    pub all: bool,

    /// Per-request timeout in milliseconds; unset uses the HTTP client defaults
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ProbeConfig {
    /// Get the probe timeout as Duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self { catch_panic: true }
    }
}

// Default value functions
fn default_name() -> String {
    "kube-status".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_start_wait_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Every config file that exists is merged, so a key set in a higher
    /// priority file overrides the same key from a lower one:
    /// 1. Current working directory: ./config.toml (highest)
    /// 2. XDG config directory: ~/.config/kube-status/config.toml
    /// 3. System directory: /etc/kube-status/config.toml (lowest)
    ///
    /// Environment variables (KUBE_STATUS_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let config = Self::layered(&config_paths).merge(Self::env()).extract()?;
        Ok(config)
    }

    /// Defaults plus every existing file in `paths` (highest priority first)
    fn layered(paths: &[PathBuf]) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so that higher priority files override
        for path in paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the search path and loads directly from the given path.
    /// Environment variables still take precedence.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment overrides)
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()?;

        Ok(config)
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Find all possible config file paths
    ///
    /// Returns paths in priority order (highest first).
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("kube-status");
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc/kube-status/config.toml"));

        paths
    }

    /// HTTP URL of the configured service
    pub fn url(&self) -> String {
        self.service.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.start_wait(), Duration::from_millis(100));
        assert_eq!(config.service.log_level, "info");
        assert!(config.service.dependencies.is_empty());
        assert!(config.service.uuid.is_none());
        assert!(!config.probe.all);
        assert!(config.middleware.catch_panic);
    }

    #[test]
    fn test_url_defaults_to_localhost() {
        let mut config = Config::default();
        config.service.port = 9050;
        assert_eq!(config.url(), "http://localhost:9050");
        assert_eq!(config.service.bind_addr(), "0.0.0.0:9050");

        config.service.hostname = "127.0.0.1".to_string();
        assert_eq!(config.url(), "http://127.0.0.1:9050");
        assert_eq!(config.service.bind_addr(), "127.0.0.1:9050");
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            [service]
            port = 9051
            start_wait_ms = 10
            uuid = "01020304-0506-0708-090a-0b0c0d0e0f10"
            dependencies = ["http://localhost:9052"]

            [probe]
            all = true
            timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.service.port, 9051);
        assert_eq!(config.service.start_wait(), Duration::from_millis(10));
        assert_eq!(
            config.service.uuid.unwrap().to_string(),
            "01020304-0506-0708-090a-0b0c0d0e0f10"
        );
        assert_eq!(config.service.dependencies, vec!["http://localhost:9052"]);
        assert!(config.probe.all);
        assert_eq!(config.probe.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.service.name, "kube-status");
    }

    #[test]
    fn test_negative_port_rejected() {
        let result = Config::from_toml("[service]\nport = -1\n");
        assert!(matches!(result, Err(crate::error::Error::Config(_))));
    }

    #[test]
    fn test_negative_start_wait_rejected() {
        let result = Config::from_toml("[service]\nstart_wait_ms = -5\n");
        assert!(matches!(result, Err(crate::error::Error::Config(_))));
    }

    #[test]
    fn test_layered_files_merge_by_priority() {
        let mut high = tempfile::NamedTempFile::new().unwrap();
        writeln!(high, "[service]\nport = 9001").unwrap();
        let mut low = tempfile::NamedTempFile::new().unwrap();
        writeln!(low, "[service]\nport = 9002\nname = \"orders\"").unwrap();
        let missing = low.path().with_extension("missing");

        let paths = vec![high.path().to_path_buf(), missing, low.path().to_path_buf()];
        let config: Config = Config::layered(&paths).extract().unwrap();

        assert_eq!(config.service.port, 9001);
        assert_eq!(config.service.name, "orders");
        assert_eq!(config.service.start_wait_ms, 100);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nhostname = \"127.0.0.1\"\nport = 9999").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.hostname, "127.0.0.1");
        assert_eq!(config.service.port, 9999);
    }
}
