//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; loading and validation live in `loader.rs`/`validate.rs`.
//! - Enum settings round-trip through their lowercase string form.

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub http: HttpConfig,
    /// Record store connection string.
    pub database_url: String,
    /// Create and migrate the catalog schema on startup. Off by default so an
    /// existing record store is opened without being modified.
    pub migrate_database: bool,
    /// Filesystem roots.
    pub storage: StorageConfig,
    /// Viewer artifact publication settings.
    pub viewer: ViewerConfig,
    /// External tool and worker settings.
    pub conversion: ConversionConfig,
    /// How resolver misses and tool failures map onto HTTP statuses.
    pub status_policy: StatusPolicy,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Interface to bind.
    pub bind_addr: IpAddr,
    /// Listener port, never zero.
    pub port: u16,
}

/// Filesystem roots used by downloads and conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Absolute root that downloads are confined to.
    pub download_root: PathBuf,
    /// Absolute root under which viewer artifacts are generated.
    pub viewer_root: PathBuf,
}

/// Where viewer artifacts land and how they are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// URL prefix mapped onto `viewer_root` (for example `/pointclouds`).
    pub url_prefix: String,
    /// Output directory naming scheme.
    pub layout: ViewerLayout,
    /// Whether the server mounts `viewer_root` at `url_prefix` itself.
    pub serve_static: bool,
}

/// Output directory naming scheme for converted point clouds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerLayout {
    /// One directory and page per asset (`asset-<id>`).
    PerAsset,
    /// A single fixed `temp` directory and page shared by every conversion.
    Shared,
}

impl ViewerLayout {
    /// Render the layout as its configuration string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerAsset => "per_asset",
            Self::Shared => "shared",
        }
    }
}

impl FromStr for ViewerLayout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_asset" | "per-asset" => Ok(Self::PerAsset),
            "shared" | "legacy" => Ok(Self::Shared),
            _ => Err(ConfigError::invalid(
                "DRONEVAULT_VIEWER_LAYOUT",
                s,
                "unknown_layout",
            )),
        }
    }
}

/// HTTP status mapping for conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Non-2xx problem responses (404 for unknown assets, 502 for tool failures).
    Strict,
    /// `200 text/plain` bodies carrying the error text.
    Legacy,
}

impl StatusPolicy {
    /// Render the policy as its configuration string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Legacy => "legacy",
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "legacy" => Ok(Self::Legacy),
            _ => Err(ConfigError::invalid(
                "DRONEVAULT_STATUS_POLICY",
                s,
                "unknown_policy",
            )),
        }
    }
}

/// External tool and worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Integrity repair program (looked up on `PATH` when not absolute).
    pub repair_program: String,
    /// Viewer converter program.
    pub convert_program: String,
    /// Maximum conversions running at once.
    pub workers: usize,
    /// Timeout applied to each tool invocation.
    pub tool_timeout: Duration,
}

/// Logging settings forwarded to the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Default log filter.
    pub log_level: String,
    /// Explicit output format (`json` or `pretty`); inferred when `None`.
    pub log_format: Option<String>,
}
