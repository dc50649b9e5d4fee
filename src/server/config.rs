//! Server configuration parsing.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Server configuration loaded from a TOML file.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// Server bind settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1" or "0.0.0.0").
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which backend holds the documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Persistent fjall store at `path`.
    #[default]
    Fjall,
    /// Ephemeral in-memory store; `path` is ignored.
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Fjall,
            path: PathBuf::from(".student-kv"),
        }
    }
}

/// Cross-origin settings. Disabled means cross-origin requests are denied.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Allowed origins; `"*"` allows any.
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache duration in seconds.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_origins: Vec::new(),
            allow_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allow_headers: ["content-type", "authorization"].map(String::from).to_vec(),
            allow_credentials: false,
            max_age: 3600,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings for the server binary.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "student_kv=debug,tower_http=info".
    pub level: String,
    pub format: LogFormat,
    /// "stdout", "stderr", or a file path to append to.
    pub output: String,
    /// ANSI colors (only applied when writing to a terminal).
    pub color: bool,
    /// Include the event target (module path).
    pub target: bool,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: "stderr".to_string(),
            color: true,
            target: true,
            timestamps: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Configuration for an in-memory server, used by tests.
    pub fn in_memory() -> Self {
        Self {
            store: StoreConfig {
                backend: BackendKind::Memory,
                ..StoreConfig::default()
            },
            ..Self::default()
        }
    }

    /// Get the socket address string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
bind = "0.0.0.0"
port = 9000

[store]
backend = "fjall"
path = "/var/lib/student-kv"

[cors]
enabled = true
allow_origins = ["*"]

[logging]
level = "student_kv=debug"
format = "json"
output = "stdout"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.store.backend, BackendKind::Fjall);
        assert_eq!(config.store.path, PathBuf::from("/var/lib/student-kv"));
        assert!(config.cors.enabled);
        assert_eq!(config.cors.allow_origins, vec!["*"]);
        assert_eq!(config.cors.max_age, 3600);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.output, "stdout");
        assert!(config.logging.timestamps);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.store.path, PathBuf::from(".student-kv"));
        assert!(!config.cors.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_memory_backend() {
        let config = Config::parse("[store]\nbackend = \"memory\"").unwrap();
        assert_eq!(config.store.backend, BackendKind::Memory);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Config::parse("[store]\nbackend = \"redis\"").is_err());
    }
}
