//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use dronevault_core::{CoreError, PipelineStage};
use dronevault_fsops::FsOpsError;
use tracing::{error, warn};

use crate::http::constants::{
    PROBLEM_CONTENT_TYPE, PROBLEM_CONVERSION_FAILED, PROBLEM_FORBIDDEN, PROBLEM_INTERNAL,
    PROBLEM_NOT_FOUND, PROBLEM_SERVICE_UNAVAILABLE,
};
use crate::models::ProblemDetails;

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    stage: Option<PipelineStage>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            stage: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    /// Never carries a detail: the rejected path must not be echoed back.
    pub(crate) const fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, PROBLEM_FORBIDDEN, "forbidden")
    }

    pub(crate) fn conversion_failed(stage: PipelineStage, detail: impl Into<String>) -> Self {
        let mut err = Self::new(
            StatusCode::BAD_GATEWAY,
            PROBLEM_CONVERSION_FAILED,
            "point cloud conversion failed",
        )
        .with_detail(detail);
        err.stage = Some(stage);
        err
    }

    pub(crate) fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_SERVICE_UNAVAILABLE,
            "service unavailable",
        )
        .with_detail(detail)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { resource, .. } => Self::not_found(format!("{resource} not found")),
            CoreError::Forbidden { reason } => {
                warn!(reason, "request rejected");
                Self::forbidden()
            }
            CoreError::ToolFailure { stage, detail } => Self::conversion_failed(stage, detail),
            CoreError::Store { operation, source } => {
                error!(operation, error = %source, "record store failure");
                Self::internal("record store unavailable")
            }
        }
    }
}

impl From<FsOpsError> for ApiError {
    fn from(err: FsOpsError) -> Self {
        match err {
            FsOpsError::PathRejected { reason } => {
                warn!(reason, "download path rejected");
                Self::forbidden()
            }
            FsOpsError::PathMissing { .. } => Self::not_found("file not found"),
            FsOpsError::Io {
                operation, source, ..
            } => {
                error!(operation, error = %source, "filesystem failure");
                Self::internal("filesystem failure")
            }
            FsOpsError::WorkerUnavailable { reason } => {
                error!(reason, "conversion worker unavailable");
                Self::service_unavailable("conversion worker unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            stage: self.stage,
        };
        let mut response = (self.status, Json(body)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn body_json(err: ApiError) -> anyhow::Result<serde_json::Value> {
        let response = err.into_response();
        assert_eq!(
            response.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static(PROBLEM_CONTENT_TYPE))
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn forbidden_paths_are_never_echoed() -> anyhow::Result<()> {
        let err = ApiError::from(FsOpsError::PathRejected {
            reason: "traversal",
        });
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        let body = body_json(err).await?;
        assert_eq!(body["type"], PROBLEM_FORBIDDEN);
        assert!(body.get("detail").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn missing_files_hide_the_probed_path() -> anyhow::Result<()> {
        let err = ApiError::from(FsOpsError::PathMissing {
            path: PathBuf::from("/data/surveys/site1/ortho.tif"),
        });
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let body = body_json(err).await?;
        assert_eq!(body["detail"], "file not found");
        Ok(())
    }

    #[tokio::test]
    async fn tool_failures_map_to_bad_gateway_with_stage() -> anyhow::Result<()> {
        let err = ApiError::from(CoreError::ToolFailure {
            stage: PipelineStage::Repair,
            detail: "ERROR: corrupt header".into(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        let body = body_json(err).await?;
        assert_eq!(body["stage"], "repair");
        assert_eq!(body["detail"], "ERROR: corrupt header");
        assert_eq!(body["status"], 502);
        Ok(())
    }

    #[test]
    fn store_failures_are_internal_errors() {
        let err = ApiError::from(CoreError::store(
            "catalog.resolve",
            std::io::Error::other("database is locked"),
        ));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind, PROBLEM_INTERNAL);

        let unavailable = ApiError::from(FsOpsError::WorkerUnavailable {
            reason: "job_dropped",
        });
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
