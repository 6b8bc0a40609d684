//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    routing::get,
};
use dronevault_config::AppConfig;
use dronevault_core::AssetCatalog;
use dronevault_fsops::{ConversionWorker, PathGuard};
use dronevault_telemetry::{
    Metrics, REQUEST_ID_HEADER, build_sha, propagate_request_id_layer, set_request_id_layer,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::conversion::process_pointcloud;
use crate::http::download::download_file;
use crate::http::health::{health, metrics};
use crate::http::sites::{get_site, list_sites};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Services the HTTP layer drives.
pub struct ApiDependencies {
    /// Read-only survey catalog.
    pub catalog: Arc<dyn AssetCatalog>,
    /// Bounded conversion worker.
    pub worker: ConversionWorker,
    /// Shared metrics registry.
    pub telemetry: Metrics,
}

/// Axum router wrapper that hosts the Dronevault API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router from configuration and shared services.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::DownloadRoot`] when the download root cannot
    /// back a path guard.
    pub fn new(config: &AppConfig, deps: ApiDependencies) -> ApiServerResult<Self> {
        let guard = PathGuard::new(&config.storage.download_root)
            .map_err(|source| ApiServerError::DownloadRoot { source })?;
        let state = Arc::new(ApiState::new(
            deps.catalog,
            deps.worker,
            guard,
            config.viewer.clone(),
            config.storage.viewer_root.clone(),
            config.status_policy,
            deps.telemetry.clone(),
        ));

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(deps.telemetry));

        let router = Self::mount_viewer(Self::build_router(), &state);
        let router = router
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Ok(Self { router })
    }

    fn build_router() -> Router<Arc<ApiState>> {
        Self::public_routes().merge(Self::v1_routes())
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/process_pointcloud/{asset_id}", get(process_pointcloud))
            .route("/download_file/{*path}", get(download_file))
    }

    fn v1_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/v1/sites", get(list_sites))
            .route("/v1/sites/{site_id}", get(get_site))
    }

    /// Serve generated viewer pages from the viewer root at the URL prefix.
    fn mount_viewer(router: Router<Arc<ApiState>>, state: &ApiState) -> Router<Arc<ApiState>> {
        if !state.viewer.serve_static {
            return router;
        }
        let prefix = state.viewer.url_prefix.as_str();
        let files = ServeDir::new(state.viewer_root());
        if prefix.is_empty() {
            router.fallback_service(files)
        } else if prefix.starts_with('/') {
            router.nest_service(prefix, files)
        } else {
            info!(prefix, "viewer prefix is an external URL; static mount skipped");
            router
        }
    }

    /// Consume the server and return the fully layered router.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API on `addr` until the process stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve the API on `addr` until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "starting API");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
