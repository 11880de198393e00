//! Configuration module for the commbench server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Command-line arguments for the server
#[derive(Parser, Debug, Default)]
#[command(name = "commbench-server")]
#[command(version)]
#[command(about = "User registry over raw TCP, HTTP/JSON and RPC", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address for the raw socket binding (e.g., 0.0.0.0:8080)
    #[arg(long)]
    pub socket_listen: Option<String>,

    /// Address for the HTTP binding (e.g., 0.0.0.0:5000)
    #[arg(long)]
    pub http_listen: Option<String>,

    /// Address for the RPC binding (e.g., 0.0.0.0:50051)
    #[arg(long)]
    pub rpc_listen: Option<String>,

    /// Number of RPC worker threads
    #[arg(long)]
    pub rpc_workers: Option<usize>,

    /// Socket binding read buffer size in bytes
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Cap on concurrent socket connections (unbounded when unset)
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Seed the registry with sample users
    #[arg(long)]
    pub seed: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Raw socket binding configuration
#[derive(Debug, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_socket_listen")]
    pub listen: String,
    /// Bytes read per round trip
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    pub max_connections: Option<usize>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            listen: default_socket_listen(),
            buffer_size: default_buffer_size(),
            max_connections: None,
        }
    }
}

/// HTTP binding configuration
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_listen")]
    pub listen: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
        }
    }
}

/// RPC binding configuration
#[derive(Debug, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_listen")]
    pub listen: String,
    #[serde(default = "default_rpc_workers")]
    pub workers: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen: default_rpc_listen(),
            workers: default_rpc_workers(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RegistryConfig {
    #[serde(default)]
    pub seed_sample_users: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_socket_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_http_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_rpc_listen() -> String {
    "0.0.0.0:50051".to_string()
}

fn default_buffer_size() -> usize {
    1024
}

fn default_rpc_workers() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub socket_listen: String,
    pub http_listen: String,
    pub rpc_listen: String,
    pub rpc_workers: usize,
    pub buffer_size: usize,
    pub max_connections: Option<usize>,
    pub seed_sample_users: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(CliArgs::default(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = match cli.config {
            Some(ref config_path) => {
                let contents = std::fs::read_to_string(config_path)
                    .map_err(|source| ConfigError::FileRead {
                        path: config_path.clone(),
                        source,
                    })?;
                toml::from_str(&contents)
                    .map_err(|source| ConfigError::TomlParse {
                        path: config_path.clone(),
                        source,
                    })?
            }
            None => TomlConfig::default(),
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            socket_listen: cli.socket_listen.unwrap_or(toml_config.socket.listen),
            http_listen: cli.http_listen.unwrap_or(toml_config.http.listen),
            rpc_listen: cli.rpc_listen.unwrap_or(toml_config.rpc.listen),
            rpc_workers: cli.rpc_workers.unwrap_or(toml_config.rpc.workers),
            buffer_size: cli.buffer_size.unwrap_or(toml_config.socket.buffer_size),
            max_connections: cli.max_connections.or(toml_config.socket.max_connections),
            seed_sample_users: cli.seed || toml_config.registry.seed_sample_users,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_workers == 0 {
            return Err(ConfigError::Invalid("rpc.workers must be at least 1".into()));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "socket.buffer_size must be at least 1".into(),
            ));
        }
        if self.max_connections == Some(0) {
            return Err(ConfigError::Invalid(
                "socket.max_connections must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.socket_listen, "0.0.0.0:8080");
        assert_eq!(config.http_listen, "0.0.0.0:5000");
        assert_eq!(config.rpc_listen, "0.0.0.0:50051");
        assert_eq!(config.rpc_workers, 10);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.max_connections, None);
        assert!(!config.seed_sample_users);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [socket]
            listen = "127.0.0.1:9000"
            buffer_size = 4096
            max_connections = 64

            [rpc]
            workers = 4

            [registry]
            seed_sample_users = true

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.socket.listen, "127.0.0.1:9000");
        assert_eq!(config.socket.buffer_size, 4096);
        assert_eq!(config.socket.max_connections, Some(64));
        assert_eq!(config.http.listen, "0.0.0.0:5000");
        assert_eq!(config.rpc.workers, 4);
        assert!(config.registry.seed_sample_users);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_takes_precedence() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [rpc]
            listen = "127.0.0.1:1"
            workers = 2

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        let cli = CliArgs {
            rpc_workers: Some(8),
            log_level: Some("trace".to_string()),
            ..CliArgs::default()
        };

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.rpc_listen, "127.0.0.1:1");
        assert_eq!(config.rpc_workers, 8);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let cli = CliArgs {
            rpc_workers: Some(0),
            ..CliArgs::default()
        };
        assert!(matches!(
            Config::from_args(cli),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs {
            config: Some(PathBuf::from("/nonexistent/commbench.toml")),
            ..CliArgs::default()
        };
        let err = Config::from_args(cli).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
        assert!(err.to_string().contains("/nonexistent/commbench.toml"));
    }
}
