//! Web server configuration.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};

/// Configuration for the web server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address to listen on; a bare `:port` listens on all interfaces
    pub listen_address: String,
    /// Path under which metrics are exposed
    pub metrics_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: crate::DEFAULT_LISTEN_ADDRESS.to_string(),
            metrics_path: crate::DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl WebConfig {
    /// Create a new web configuration with a custom listen address and metrics path.
    pub fn new(listen_address: impl Into<String>, metrics_path: impl Into<String>) -> Self {
        Self {
            listen_address: listen_address.into(),
            metrics_path: metrics_path.into(),
        }
    }

    /// Set the listen address.
    pub fn with_listen_address(mut self, listen_address: impl Into<String>) -> Self {
        self.listen_address = listen_address.into();
        self
    }

    /// Set the metrics path.
    pub fn with_metrics_path(mut self, metrics_path: impl Into<String>) -> Self {
        self.metrics_path = metrics_path.into();
        self
    }

    /// Resolve the listen address to a socket address.
    ///
    /// A bare `:port` resolves to the IPv6 unspecified address, which also
    /// accepts IPv4 on dual-stack hosts.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let address = if self.listen_address.starts_with(':') {
            format!("[::]{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };

        address
            .to_socket_addrs()
            .map_err(|e| {
                ExporterError::config_error(format!(
                    "Invalid listen address {:?}: {}",
                    self.listen_address, e
                ))
            })?
            .next()
            .ok_or_else(|| {
                ExporterError::config_error(format!(
                    "Listen address {:?} resolved to nothing",
                    self.listen_address
                ))
            })
    }

    /// Check the configuration before serving.
    pub fn validate(&self) -> Result<()> {
        if !self.metrics_path.starts_with('/') {
            return Err(ExporterError::config_error(format!(
                "Metrics path {:?} must start with '/'",
                self.metrics_path
            )));
        }
        if self.metrics_path == "/" {
            return Err(ExporterError::config_error(
                "Metrics path cannot be '/', it serves the index page",
            ));
        }
        self.bind_address().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebConfig::default();
        assert_eq!(config.listen_address, ":9255");
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(
            config.bind_address().unwrap(),
            "[::]:9255".parse::<SocketAddr>().unwrap()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_host() {
        let config = WebConfig::default().with_listen_address("127.0.0.1:9100");
        assert_eq!(
            config.bind_address().unwrap(),
            "127.0.0.1:9100".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(WebConfig::default()
            .with_listen_address("not an address")
            .validate()
            .is_err());
        assert!(WebConfig::default()
            .with_metrics_path("metrics")
            .validate()
            .is_err());
        assert!(WebConfig::default().with_metrics_path("/").validate().is_err());
    }
}
