//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Batch ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "ingest_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Batch ingestion tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Maximum number of items of one batch stored concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    59880
}

fn default_db_path() -> String {
    "ingest.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrency() -> usize {
    8
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `INGEST_HOST` overrides `server.host`
/// - `INGEST_PORT` overrides `server.port`
/// - `INGEST_DB_PATH` overrides `database.path`
/// - `INGEST_LOG_LEVEL` overrides `logging.level`
/// - `INGEST_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `INGEST_MAX_CONCURRENCY` overrides `ingest.max_concurrency`
/// - `INGEST_MAX_BODY_BYTES` overrides `ingest.max_body_bytes`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => parse_config(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Parses a TOML document into a [`Config`].
///
/// # Errors
///
/// Returns `ConfigError::Parse` on invalid TOML or mistyped values.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("INGEST_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("INGEST_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("INGEST_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("INGEST_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("INGEST_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(max) = var("INGEST_MAX_CONCURRENCY") {
        if let Ok(parsed) = max.parse() {
            config.ingest.max_concurrency = parsed;
        }
    }
    if let Some(max) = var("INGEST_MAX_BODY_BYTES") {
        if let Ok(parsed) = max.parse() {
            config.ingest.max_body_bytes = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").expect("empty config should parse");
        assert_eq!(config.server.port, 59880);
        assert_eq!(config.database.path, "ingest.db");
        assert_eq!(config.database.pool_max_size, 8);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.ingest.max_concurrency, 8);
        assert_eq!(config.ingest.max_body_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 8080

            [ingest]
            max_concurrency = 2
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.ingest.max_concurrency, 2);
        assert_eq!(config.ingest.max_body_bytes, default_max_body_bytes());
    }

    #[test]
    fn mistyped_value_is_a_parse_error() {
        let err = parse_config("[server]\nport = \"eighty\"").expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("INGEST_PORT", "9000"),
            ("INGEST_DB_PATH", "/var/lib/ingest/events.db"),
            ("INGEST_LOG_JSON", "1"),
            ("INGEST_MAX_CONCURRENCY", "32"),
            ("INGEST_MAX_BODY_BYTES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path, "/var/lib/ingest/events.db");
        assert!(config.logging.json);
        assert_eq!(config.ingest.max_concurrency, 32);
        // Unparseable overrides are ignored.
        assert_eq!(config.ingest.max_body_bytes, default_max_body_bytes());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("missing file should not be an error");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
    }
}
