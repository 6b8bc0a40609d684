//! Health and metrics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use dronevault_fsops::HEALTH_COMPONENT;
use dronevault_telemetry::{MetricsSnapshot, build_sha};
use serde::Serialize;
use tracing::{error, warn};

use crate::http::constants::{COMPONENT_DATABASE, METRICS_CONTENT_TYPE};
use crate::http::errors::ApiError;
use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct HealthComponent {
    pub(crate) status: &'static str,
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: String,
    pub(crate) database: HealthComponent,
    pub(crate) degraded: Vec<String>,
    pub(crate) metrics: MetricsSnapshot,
}

pub(crate) async fn health(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    state.set_component_degraded(HEALTH_COMPONENT, state.worker.is_degraded());
    match state.catalog.ping().await {
        Ok(()) => {
            state.remove_degraded_component(COMPONENT_DATABASE);
            let degraded = state.current_health_degraded();
            let status = if degraded.is_empty() {
                "ok"
            } else {
                "degraded"
            };
            Ok(Json(HealthResponse {
                status,
                build: build_sha().to_string(),
                database: HealthComponent { status: "ok" },
                degraded,
                metrics: state.telemetry.snapshot(),
            }))
        }
        Err(err) => {
            state.add_degraded_component(COMPONENT_DATABASE);
            warn!(error = %err, "health check failed to reach the record store");
            Err(ApiError::service_unavailable(
                "record store is currently unavailable",
            ))
        }
    }
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::CONTENT_TYPE, METRICS_CONTENT_TYPE)
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use dronevault_config::ViewerLayout;
    use dronevault_test_support::SurveyTree;

    #[tokio::test]
    async fn healthy_store_reports_ok() -> anyhow::Result<()> {
        let tree = SurveyTree::new()?;
        let state = Arc::new(test_state(&tree, ViewerLayout::PerAsset).await?);
        let Json(body) = health(State(Arc::clone(&state))).await.map_err(|err| {
            anyhow::anyhow!("health failed with {}", err.status)
        })?;
        assert_eq!(body.status, "ok");
        assert!(body.degraded.is_empty());
        assert_eq!(body.metrics.conversions_in_flight, 0);
        Ok(())
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() -> anyhow::Result<()> {
        let tree = SurveyTree::new()?;
        let state = Arc::new(test_state(&tree, ViewerLayout::PerAsset).await?);
        state.telemetry.inc_http_request("/health", 200);
        let response = metrics(State(state))
            .await
            .map_err(|err| anyhow::anyhow!("metrics failed with {}", err.status))?;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(bytes.to_vec())?;
        assert!(text.contains("http_requests_total"));
        Ok(())
    }
}
