//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (RELAY_*), used as defaults for unset fields
//! - TOML configuration file
//! - Command line arguments (applied by the binary on top of the file)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Default config file locations, searched in order.
pub const CONFIG_PATHS: [&str; 3] = [
    "relay.toml",
    "/etc/relay/relay.toml",
    "~/.config/relay/relay.toml",
];

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Host both listeners bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// WebSocket listener port.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// HTTP status listener port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn port_from_env(var: &str, fallback: u16) -> u16 {
    std::env::var(var)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(fallback)
}

fn default_ws_port() -> u16 {
    port_from_env("RELAY_WS_PORT", 8080)
}

fn default_http_port() -> u16 {
    port_from_env("RELAY_HTTP_PORT", 3001)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            ws_port: default_ws_port(),
            http_port: default_http_port(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the first default location that exists.
    ///
    /// Falls back to defaults with environment overrides when no file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed,
    /// or if an explicit `path` does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        for path in &CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check that both listeners can be bound side by side.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not an IP address or both listeners
    /// share a fixed port.
    pub fn validate(&self) -> Result<()> {
        self.ws_bind_addr()?;
        if self.ws_port == self.http_port && self.ws_port != 0 {
            bail!(
                "WebSocket and HTTP listeners must use different ports (both are {})",
                self.ws_port
            );
        }
        Ok(())
    }

    /// Get the socket address for the WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not a valid IP address.
    pub fn ws_bind_addr(&self) -> Result<SocketAddr> {
        self.bind_addr(self.ws_port)
    }

    /// Get the socket address for the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not a valid IP address.
    pub fn http_bind_addr(&self) -> Result<SocketAddr> {
        self.bind_addr(self.http_port)
    }

    fn bind_addr(&self, port: u16) -> Result<SocketAddr> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let ip: IpAddr = host
            .parse()
            .with_context(|| format!("Invalid host address: {}", self.host))?;
        Ok(SocketAddr::new(ip, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str, ws_port: u16, http_port: u16) -> Config {
        Config {
            host: host.to_string(),
            ws_port,
            http_port,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        if std::env::var("RELAY_WS_PORT").is_err() {
            assert_eq!(config.ws_port, 8080);
        }
        if std::env::var("RELAY_HTTP_PORT").is_err() {
            assert_eq!(config.http_port, 3001);
        }
    }

    #[test]
    fn test_config_bind_addrs() {
        let config = config("0.0.0.0", 8080, 3001);
        assert_eq!(config.ws_bind_addr().unwrap().port(), 8080);
        assert_eq!(config.http_bind_addr().unwrap().port(), 3001);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_ipv6_host() {
        let config = config("[::1]", 9000, 9001);
        let addr = config.ws_bind_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 9000);
    }

    #[test]
    fn test_config_rejects_shared_port() {
        assert!(config("127.0.0.1", 9000, 9000).validate().is_err());
        // Two ephemeral ports never collide.
        assert!(config("127.0.0.1", 0, 0).validate().is_ok());
    }

    #[test]
    fn test_config_rejects_hostname() {
        assert!(config("localhost", 9000, 9001).validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "127.0.0.1"
            ws_port = 9000
            http_port = 9001
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.ws_port, 9000);
        assert_eq!(config.http_port, 9001);
    }

    #[test]
    fn test_config_from_file() {
        let path = std::env::temp_dir().join(format!("relay-config-{}.toml", std::process::id()));
        std::fs::write(&path, "host = \"127.0.0.1\"\nws_port = 7000\nhttp_port = 7001\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.ws_port, 7000);
        assert_eq!(config.http_port, 7001);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_config_missing_explicit_file() {
        let path = std::env::temp_dir().join("relay-config-does-not-exist.toml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_config_invalid_toml() {
        assert!(toml::from_str::<Config>("ws_port = \"not a port\"").is_err());
    }
}
