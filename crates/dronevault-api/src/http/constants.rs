//! Shared HTTP constants (route prefixes, content types, problem URIs).

pub(crate) const DOWNLOAD_PREFIX: &str = "/download_file/";
pub(crate) const CONVERT_PREFIX: &str = "/process_pointcloud/";

pub(crate) const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";
pub(crate) const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Body returned under the legacy status policy when an asset id is unknown.
pub(crate) const LEGACY_NOT_FOUND_BODY: &str = "Error: Path not found in database";

pub(crate) const PROBLEM_INTERNAL: &str = "https://dronevault.dev/problems/internal";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://dronevault.dev/problems/not-found";
pub(crate) const PROBLEM_FORBIDDEN: &str = "https://dronevault.dev/problems/forbidden";
pub(crate) const PROBLEM_CONVERSION_FAILED: &str =
    "https://dronevault.dev/problems/conversion-failed";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://dronevault.dev/problems/service-unavailable";

pub(crate) const COMPONENT_DATABASE: &str = "database";
