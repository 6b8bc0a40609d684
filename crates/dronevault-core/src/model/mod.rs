//! Survey catalog records and conversion outcomes shared across the workspace.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Identifier of one point-cloud source file in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub i64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a surveyed site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub i64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Survey product families held in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Raw point cloud (LAS/LAZ) that can be converted for the web viewer.
    PointCloud,
    /// Orthophoto mosaic.
    Ortho,
    /// Digital surface model.
    Dsm,
}

impl ProductKind {
    /// Machine-friendly label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PointCloud => "pointcloud",
            Self::Ortho => "ortho",
            Self::Dsm => "dsm",
        }
    }
}

/// Any catalog product row (point cloud, orthophoto, or DSM). Read-only to the services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Row identifier within its product table.
    pub id: AssetId,
    /// Owning site.
    pub site_id: SiteId,
    /// Product family.
    pub kind: ProductKind,
    /// Stored file path.
    pub path: PathBuf,
    /// Capture date as recorded by the survey team.
    pub captured_on: Option<String>,
}

/// Site centroid expressed in projected (easting, northing) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Easting in metres.
    pub easting: f64,
    /// Northing in metres.
    pub northing: f64,
}

impl Centroid {
    /// Parse an `"easting, northing"` pair. Trailing components are ignored;
    /// `None` when fewer than two finite numbers are present.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',').map(str::trim);
        let easting = parts.next()?.parse::<f64>().ok()?;
        let northing = parts.next()?.parse::<f64>().ok()?;
        (easting.is_finite() && northing.is_finite()).then_some(Self { easting, northing })
    }
}

/// Surveyed site with its raw and parsed centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Site identifier.
    pub id: SiteId,
    /// Display name.
    pub name: String,
    /// Centroid exactly as stored.
    pub centroid_raw: String,
    /// Parsed centroid, `None` when the stored value is malformed.
    pub centroid: Option<Centroid>,
}

/// Stages of the conversion pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Integrity repair and validation of the source file.
    Repair,
    /// Conversion into the web viewer format.
    Convert,
}

impl PipelineStage {
    /// Machine-friendly label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repair => "repair",
            Self::Convert => "convert",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Both stages succeeded; the viewer page is available at `viewer_url`.
    Success {
        /// Relative (or prefixed) URL of the generated viewer page.
        viewer_url: String,
    },
    /// A stage failed and the pipeline halted.
    Failure {
        /// Stage that failed.
        stage: PipelineStage,
        /// Raw diagnostic text from the tool.
        detail: String,
    },
}

impl ConversionOutcome {
    /// Returns `true` for successful conversions.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Convert the outcome into a result carrying the viewer URL.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ToolFailure`] when the pipeline failed.
    pub fn into_result(self) -> CoreResult<String> {
        match self {
            Self::Success { viewer_url } => Ok(viewer_url),
            Self::Failure { stage, detail } => Err(CoreError::ToolFailure { stage, detail }),
        }
    }
}
