//! Configuration for the server and client binaries.
//!
//! The server takes its port on the command line and can pull the bind host
//! and log level from an optional TOML file; CLI arguments take precedence
//! over config file values. The client is configured entirely on the
//! command line.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for `pcc-server`.
#[derive(Parser, Debug)]
#[command(name = "pcc-server")]
#[command(version = "0.1.0")]
#[command(about = "Counts printable characters in files sent over TCP", long_about = None)]
pub struct ServerArgs {
    /// TCP port to listen on
    pub port: u16,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Command-line arguments for `pcc-client`.
#[derive(Parser, Debug)]
#[command(name = "pcc-client")]
#[command(version = "0.1.0")]
#[command(about = "Sends a file to a pcc server and prints the printable count", long_about = None)]
pub struct ClientArgs {
    /// Server address (hostname or IP)
    pub host: String,

    /// Server port
    pub port: u16,

    /// Path to the file to send
    pub file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure for the server.
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServerConfig {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(ServerArgs::parse())
    }

    fn resolve(cli: ServerArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(ServerConfig {
            host: toml_config.server.host,
            port: cli.port,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }

    /// Socket address string to bind.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_log_level_takes_precedence() {
        let cli = ServerArgs {
            port: 9000,
            config: None,
            log_level: "trace".to_string(),
        };
        let config = ServerConfig::resolve(cli).unwrap();
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
    }
}
