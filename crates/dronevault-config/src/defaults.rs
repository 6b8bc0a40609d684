//! Fallback values applied when the environment leaves a setting unset.

/// Interface the HTTP listener binds to.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
/// HTTP listener port.
pub const DEFAULT_HTTP_PORT: u16 = 5050;
/// URL prefix under which generated viewer pages are published.
pub const DEFAULT_VIEWER_URL_PREFIX: &str = "/pointclouds";
/// Integrity repair tool.
pub const DEFAULT_REPAIR_PROGRAM: &str = "lasinfo";
/// Point cloud to web viewer converter.
pub const DEFAULT_CONVERT_PROGRAM: &str = "PotreeConverter";
/// Concurrent conversions allowed at once.
pub const DEFAULT_CONVERSION_WORKERS: usize = 2;
/// Per-stage tool timeout in seconds.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30 * 60;
/// Default log filter when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";
