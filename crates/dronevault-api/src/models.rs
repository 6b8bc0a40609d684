//! Request and response shapes for the public HTTP API.

use dronevault_core::{AssetId, Centroid, PipelineStage, SiteId};
use serde::{Deserialize, Serialize};

/// RFC 9457 problem document returned on every non-legacy error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short constant summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Pipeline stage that failed, for conversion problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
}

/// One site with every product recorded against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteResponse {
    /// Site identifier.
    pub id: SiteId,
    /// Display name.
    pub name: String,
    /// Parsed centroid; `null` when the stored value is malformed.
    pub centroid: Option<Centroid>,
    /// Centroid exactly as stored.
    pub centroid_raw: String,
    /// Point clouds that can be converted for the viewer.
    pub pointclouds: Vec<PointCloudLink>,
    /// Orthophoto mosaics.
    pub orthophotos: Vec<DownloadLink>,
    /// Digital surface models.
    pub dsms: Vec<DownloadLink>,
}

/// Point cloud entry with its conversion trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointCloudLink {
    /// Point cloud identifier.
    pub id: AssetId,
    /// Capture date as recorded.
    pub captured_on: Option<String>,
    /// URL that converts the cloud and redirects to the viewer.
    pub convert_url: String,
}

/// Downloadable product entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadLink {
    /// Product identifier.
    pub id: AssetId,
    /// Capture date as recorded.
    pub captured_on: Option<String>,
    /// Stored file name.
    pub file_name: String,
    /// Download URL; absent when the file lies outside the download root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}
