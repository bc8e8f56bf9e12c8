//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `GAZETTEER_HOST` - Bind address (default: 127.0.0.1)
//! - `GAZETTEER_PORT` - Listen port (default: 3001)
//! - `GAZETTEER_BASE_URL` - Public URL (default: <http://localhost:3001>); an
//!   `https://` URL turns on secure session cookies
//! - `GAZETTEER_RESET_SCHEMA_ON_START` - Drop and recreate the schema before
//!   serving (default: false, development only)
//! - `GAZETTEER_ADMIN_SECRETS` - Path to a JSON file with `admin_username` and
//!   `admin_password` used to seed the first administrator
//! - `GAZETTEER_MAX_CASCADE_ENTRIES` - Upper bound on full-name rows written
//!   by one name registration (default: 10000)
//! - `GAZETTEER_UNIQUE_ITEM_NAMES` - Reject duplicate item names (default: true)
//! - `GAZETTEER_UNIQUE_ROLE_NAMES` - Reject duplicate role names (default: true)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - 0.0 to 1.0

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_MAX_CASCADE_ENTRIES: usize = 10_000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Drop and recreate the schema on startup
    pub reset_schema_on_start: bool,
    /// JSON secrets file used to seed the first administrator
    pub admin_secrets_path: Option<PathBuf>,
    /// Directory behaviour knobs
    pub directory: DirectoryConfig,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Constraints applied by the directory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Maximum full-name rows one registration may write.
    pub max_cascade_entries: usize,
    /// Reject a new or renamed item whose name is already taken.
    pub unique_item_names: bool,
    /// Reject a new role whose name is already taken.
    pub unique_role_names: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            max_cascade_entries: DEFAULT_MAX_CASCADE_ENTRIES,
            unique_item_names: true,
            unique_role_names: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let host = parse_or(&lookup, "GAZETTEER_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or(&lookup, "GAZETTEER_PORT", 3001_u16)?;
        let base_url =
            lookup("GAZETTEER_BASE_URL").unwrap_or_else(|| "http://localhost:3001".to_string());

        let reset_schema_on_start = parse_bool(&lookup, "GAZETTEER_RESET_SCHEMA_ON_START", false)?;
        let admin_secrets_path = lookup("GAZETTEER_ADMIN_SECRETS").map(PathBuf::from);

        let max_cascade_entries = parse_or(
            &lookup,
            "GAZETTEER_MAX_CASCADE_ENTRIES",
            DEFAULT_MAX_CASCADE_ENTRIES,
        )?;
        if max_cascade_entries == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GAZETTEER_MAX_CASCADE_ENTRIES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let directory = DirectoryConfig {
            max_cascade_entries,
            unique_item_names: parse_bool(&lookup, "GAZETTEER_UNIQUE_ITEM_NAMES", true)?,
            unique_role_names: parse_bool(&lookup, "GAZETTEER_UNIQUE_ROLE_NAMES", true)?,
        };

        let json_logs = lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            reset_schema_on_start,
            admin_secrets_path,
            directory,
            json_logs,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: lookup("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            sentry_traces_sample_rate: lookup("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
