//! On-demand point-cloud conversion.
//!
//! # Design
//! - Resolve, convert through the bounded worker, then redirect to the viewer page.
//! - Unknown ids and tool failures map onto HTTP according to [`StatusPolicy`].
//! - Worker and store failures are always problem responses.

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use dronevault_config::StatusPolicy;
use dronevault_core::{AssetId, CoreError, CoreResult};
use dronevault_fsops::ConversionRequest;
use tracing::{debug, info};

use crate::http::constants::LEGACY_NOT_FOUND_BODY;
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn process_pointcloud(
    State(state): State<Arc<ApiState>>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Response, ApiError> {
    let converted = match raw_id.parse::<i64>() {
        Ok(id) => run_conversion(&state, AssetId(id)).await?,
        Err(_) => {
            debug!(raw_id = %raw_id, "asset id is not an integer");
            Err(CoreError::not_found("pointcloud", &raw_id))
        }
    };
    match converted {
        Ok(viewer_url) => Ok((StatusCode::FOUND, [(LOCATION, viewer_url)]).into_response()),
        Err(err) => failure_response(state.status_policy, err),
    }
}

/// Inner result is the request outcome; the outer error is a worker failure.
async fn run_conversion(state: &ApiState, asset: AssetId) -> Result<CoreResult<String>, ApiError> {
    let source_path = match state.catalog.resolve(asset).await {
        Ok(path) => path,
        Err(err) => return Ok(Err(err)),
    };
    info!(asset_id = %asset, "conversion requested");
    let request = ConversionRequest {
        asset,
        source_path,
        target: state.viewer_target(asset),
    };
    let outcome = state.worker.submit(request).await?;
    Ok(outcome.into_result())
}

fn failure_response(policy: StatusPolicy, err: CoreError) -> Result<Response, ApiError> {
    match (policy, err) {
        (StatusPolicy::Legacy, CoreError::NotFound { .. }) => {
            Ok((StatusCode::OK, LEGACY_NOT_FOUND_BODY).into_response())
        }
        (StatusPolicy::Legacy, CoreError::ToolFailure { detail, .. }) => {
            Ok((StatusCode::OK, detail).into_response())
        }
        (_, err) => Err(ApiError::from(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronevault_core::PipelineStage;

    #[test]
    fn legacy_policy_answers_ok_with_plain_text() -> anyhow::Result<()> {
        let missing = failure_response(
            StatusPolicy::Legacy,
            CoreError::not_found("pointcloud", 7),
        )
        .map_err(|err| anyhow::anyhow!("unexpected {}", err.status))?;
        assert_eq!(missing.status(), StatusCode::OK);

        let failed = failure_response(
            StatusPolicy::Legacy,
            CoreError::ToolFailure {
                stage: PipelineStage::Convert,
                detail: "converter crashed".into(),
            },
        )
        .map_err(|err| anyhow::anyhow!("unexpected {}", err.status))?;
        assert_eq!(failed.status(), StatusCode::OK);
        Ok(())
    }

    #[test]
    fn strict_policy_and_store_errors_become_problems() {
        let missing = failure_response(StatusPolicy::Strict, CoreError::not_found("pointcloud", 7));
        assert!(missing.is_err_and(|err| err.status == StatusCode::NOT_FOUND));

        let store = failure_response(
            StatusPolicy::Legacy,
            CoreError::store("catalog.resolve", std::io::Error::other("locked")),
        );
        assert!(store.is_err_and(|err| err.status == StatusCode::INTERNAL_SERVER_ERROR));
    }
}
