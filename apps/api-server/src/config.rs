//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use http_common::ErrorStyle;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
    /// AWS DynamoDB table
    Dynamo,
}

impl StorageProvider {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        if s.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else if s.eq_ignore_ascii_case("sqlite") {
            Ok(Self::Sqlite)
        } else if s.eq_ignore_ascii_case("dynamo") || s.eq_ignore_ascii_case("dynamodb") {
            Ok(Self::Dynamo)
        } else {
            Err(ConfigError::unknown("STORAGE_PROVIDER", s, "memory, sqlite, dynamo"))
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        if s.eq_ignore_ascii_case("pretty") {
            Ok(Self::Pretty)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(ConfigError::unknown("LOG_FORMAT", s, "pretty, json"))
        }
    }
}

fn parse_error_style(s: &str) -> Result<ErrorStyle, ConfigError> {
    if s.eq_ignore_ascii_case("normalized") {
        Ok(ErrorStyle::Normalized)
    } else if s.eq_ignore_ascii_case("legacy") {
        Ok(ErrorStyle::Legacy)
    } else {
        Err(ConfigError::unknown("ERROR_RESPONSES", s, "normalized, legacy"))
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigError {
    fn unknown(field: &'static str, value: &str, allowed: &str) -> Self {
        Self {
            field,
            message: format!("unknown value '{}' (expected one of: {})", value, allowed),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Storage provider
    pub storage_provider: StorageProvider,
    /// SQLite database path (when using sqlite storage)
    pub db_path: PathBuf,
    /// DynamoDB table name (when using dynamo storage)
    pub dynamo_table: Option<String>,
    /// Log format
    pub log_format: LogFormat,
    /// How request failures are rendered
    pub error_style: ErrorStyle,
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Port: unset means default, anything else must parse
        let port = match env::var("PORT") {
            Ok(s) => s.trim().parse().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("'{}' is not a valid port", s),
            })?,
            Err(_) => 3000,
        };

        // CORS allow origin
        let cors_origin_str = env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Storage provider
        let storage_provider = StorageProvider::parse(
            env::var("STORAGE_PROVIDER").as_deref().unwrap_or("sqlite").trim(),
        )?;

        let db_path = env::var("DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/movies.db"));

        let dynamo_table = env::var("DYNAMO_TABLE_MOVIES").ok().filter(|s| !s.is_empty());
        if storage_provider == StorageProvider::Dynamo && dynamo_table.is_none() {
            return Err(ConfigError {
                field: "DYNAMO_TABLE_MOVIES",
                message: "Required when STORAGE_PROVIDER=dynamo".into(),
            });
        }

        // Log format
        let log_format =
            LogFormat::parse(env::var("LOG_FORMAT").as_deref().unwrap_or("pretty").trim())?;

        let error_style = parse_error_style(
            env::var("ERROR_RESPONSES").as_deref().unwrap_or("normalized").trim(),
        )?;

        Ok(Self {
            port,
            cors_allow_origin,
            storage_provider,
            db_path,
            dynamo_table,
            log_format,
            error_style,
        })
    }

    /// Log warnings about configuration that loses data or keeps old quirks.
    pub fn warn_if_unusual(&self) {
        if self.storage_provider == StorageProvider::Memory {
            tracing::warn!("STORAGE_PROVIDER=memory: records are lost when the process exits");
        }
        if self.error_style == ErrorStyle::Legacy {
            tracing::warn!(
                "ERROR_RESPONSES=legacy: list and delete failures answer 200, delete uses a lowercase `error` key"
            );
        }
    }
}
