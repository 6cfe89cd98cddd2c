use std::path::PathBuf;

use shelfmark_core::access_window::{
    AccessWindowPolicy, DEFAULT_AUDIOBOOK_WINDOW_DAYS, DEFAULT_EBOOK_DEADLINE_HOURS,
};

use crate::auth::jwt::JwtConfig;

/// Where content artifacts are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Files under a local directory.
    Local { root: PathBuf },
    /// Objects in one S3 bucket; credentials and region come from the
    /// standard AWS environment.
    S3 { bucket: String },
}

impl StorageConfig {
    /// | Env Var              | Default     |
    /// |----------------------|-------------|
    /// | `STORAGE_BACKEND`    | `local`     |
    /// | `STORAGE_LOCAL_ROOT` | `./storage` |
    /// | `S3_BUCKET`          | required for `s3` |
    pub fn from_env() -> Self {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        match backend.as_str() {
            "s3" => Self::S3 {
                bucket: std::env::var("S3_BUCKET")
                    .expect("S3_BUCKET must be set when STORAGE_BACKEND=s3"),
            },
            "local" => Self::Local {
                root: std::env::var("STORAGE_LOCAL_ROOT")
                    .unwrap_or_else(|_| "./storage".into())
                    .into(),
            },
            other => panic!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// Per-format content access windows.
    pub access_policy: AccessWindowPolicy,
    pub storage: StorageConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    /// | `EBOOK_DEADLINE_HOURS`  | `72`                    |
    /// | `AUDIOBOOK_WINDOW_DAYS` | `7`                     |
    ///
    /// See [`JwtConfig::from_env`] and [`StorageConfig::from_env`] for the
    /// remaining variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let ebook_deadline_hours: i64 = std::env::var("EBOOK_DEADLINE_HOURS")
            .unwrap_or_else(|_| DEFAULT_EBOOK_DEADLINE_HOURS.to_string())
            .parse()
            .expect("EBOOK_DEADLINE_HOURS must be a valid i64");

        let audiobook_window_days: i64 = std::env::var("AUDIOBOOK_WINDOW_DAYS")
            .unwrap_or_else(|_| DEFAULT_AUDIOBOOK_WINDOW_DAYS.to_string())
            .parse()
            .expect("AUDIOBOOK_WINDOW_DAYS must be a valid i64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            access_policy: AccessWindowPolicy::new(ebook_deadline_hours, audiobook_window_days),
            storage: StorageConfig::from_env(),
        }
    }
}
