//! Environment lookup that assembles an [`AppConfig`].
//!
//! Lookups go through a closure so tests can drive the loader from a map
//! instead of mutating the process environment.

use std::env;
use std::path::Path;

use tracing::debug;

use crate::defaults::{
    DEFAULT_BIND_ADDR, DEFAULT_CONVERSION_WORKERS, DEFAULT_CONVERT_PROGRAM, DEFAULT_HTTP_PORT,
    DEFAULT_LOG_LEVEL, DEFAULT_REPAIR_PROGRAM, DEFAULT_TOOL_TIMEOUT_SECS,
    DEFAULT_VIEWER_URL_PREFIX,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    AppConfig, ConversionConfig, HttpConfig, StatusPolicy, StorageConfig, TelemetryConfig,
    ViewerConfig, ViewerLayout,
};
use crate::validate::{
    absolute_dir, normalize_url_prefix, parse_bind_addr, parse_flag, parse_port,
    parse_positive_usize, parse_timeout_secs, require_non_empty,
};

const ENV_BIND_ADDR: &str = "DRONEVAULT_BIND_ADDR";
const ENV_HTTP_PORT: &str = "DRONEVAULT_HTTP_PORT";
const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_DB_MIGRATE: &str = "DRONEVAULT_DB_MIGRATE";
const ENV_DOWNLOAD_ROOT: &str = "DRONEVAULT_DOWNLOAD_ROOT";
const ENV_VIEWER_ROOT: &str = "DRONEVAULT_VIEWER_ROOT";
const ENV_VIEWER_URL_PREFIX: &str = "DRONEVAULT_VIEWER_URL_PREFIX";
const ENV_VIEWER_LAYOUT: &str = "DRONEVAULT_VIEWER_LAYOUT";
const ENV_SERVE_VIEWER: &str = "DRONEVAULT_SERVE_VIEWER";
const ENV_REPAIR_TOOL: &str = "DRONEVAULT_REPAIR_TOOL";
const ENV_CONVERT_TOOL: &str = "DRONEVAULT_CONVERT_TOOL";
const ENV_CONVERSION_WORKERS: &str = "DRONEVAULT_CONVERSION_WORKERS";
const ENV_TOOL_TIMEOUT_SECS: &str = "DRONEVAULT_TOOL_TIMEOUT_SECS";
const ENV_STATUS_POLICY: &str = "DRONEVAULT_STATUS_POLICY";
const ENV_LOG_LEVEL: &str = "DRONEVAULT_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "DRONEVAULT_LOG_FORMAT";

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing, a value fails
    /// validation, or the working directory cannot be determined.
    pub fn from_env() -> ConfigResult<Self> {
        let cwd = env::current_dir().map_err(|source| ConfigError::Io {
            operation: "config.current_dir",
            source,
        })?;
        Self::load_with(|name| env::var(name).ok(), &cwd)
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// Relative directories are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value fails validation.
    pub fn load_with<F>(lookup: F, base_dir: &Path) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::MissingEnv { name });

        let http = HttpConfig {
            bind_addr: parse_bind_addr(
                ENV_BIND_ADDR,
                &optional(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            )?,
            port: optional(ENV_HTTP_PORT)
                .map_or(Ok(DEFAULT_HTTP_PORT), |raw| parse_port(ENV_HTTP_PORT, &raw))?,
        };

        let database_url = require_non_empty(ENV_DATABASE_URL, &required(ENV_DATABASE_URL)?)?;
        let migrate_database = optional(ENV_DB_MIGRATE)
            .map_or(Ok(false), |raw| parse_flag(ENV_DB_MIGRATE, &raw))?;

        let storage = StorageConfig {
            download_root: absolute_dir(
                ENV_DOWNLOAD_ROOT,
                &required(ENV_DOWNLOAD_ROOT)?,
                base_dir,
            )?,
            viewer_root: absolute_dir(ENV_VIEWER_ROOT, &required(ENV_VIEWER_ROOT)?, base_dir)?,
        };

        let viewer = ViewerConfig {
            url_prefix: normalize_url_prefix(
                ENV_VIEWER_URL_PREFIX,
                &optional(ENV_VIEWER_URL_PREFIX)
                    .unwrap_or_else(|| DEFAULT_VIEWER_URL_PREFIX.to_string()),
            )?,
            layout: optional(ENV_VIEWER_LAYOUT)
                .map_or(Ok(ViewerLayout::PerAsset), |raw| raw.parse())?,
            serve_static: optional(ENV_SERVE_VIEWER)
                .map_or(Ok(true), |raw| parse_flag(ENV_SERVE_VIEWER, &raw))?,
        };

        let conversion = ConversionConfig {
            repair_program: optional(ENV_REPAIR_TOOL)
                .map_or_else(|| DEFAULT_REPAIR_PROGRAM.to_string(), |raw| raw.trim().to_string()),
            convert_program: optional(ENV_CONVERT_TOOL).map_or_else(
                || DEFAULT_CONVERT_PROGRAM.to_string(),
                |raw| raw.trim().to_string(),
            ),
            workers: optional(ENV_CONVERSION_WORKERS).map_or(
                Ok(DEFAULT_CONVERSION_WORKERS),
                |raw| parse_positive_usize(ENV_CONVERSION_WORKERS, &raw),
            )?,
            tool_timeout: parse_timeout_secs(
                ENV_TOOL_TIMEOUT_SECS,
                &optional(ENV_TOOL_TIMEOUT_SECS)
                    .unwrap_or_else(|| DEFAULT_TOOL_TIMEOUT_SECS.to_string()),
            )?,
        };

        let status_policy = optional(ENV_STATUS_POLICY)
            .map_or(Ok(StatusPolicy::Strict), |raw| raw.parse())?;

        let telemetry = TelemetryConfig {
            log_level: optional(ENV_LOG_LEVEL)
                .map_or_else(|| DEFAULT_LOG_LEVEL.to_string(), |raw| raw.trim().to_string()),
            log_format: optional(ENV_LOG_FORMAT).map(|raw| raw.trim().to_ascii_lowercase()),
        };

        let config = Self {
            http,
            database_url,
            migrate_database,
            storage,
            viewer,
            conversion,
            status_policy,
            telemetry,
        };
        debug!(
            port = config.http.port,
            migrate_database = config.migrate_database,
            layout = config.viewer.layout.as_str(),
            status_policy = config.status_policy.as_str(),
            workers = config.conversion.workers,
            "configuration loaded"
        );
        Ok(config)
    }
}
