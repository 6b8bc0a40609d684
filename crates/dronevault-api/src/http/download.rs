//! Confined file downloads.
//!
//! # Design
//! - The raw (still percent-encoded) URI tail goes to the path guard so it is
//!   decoded exactly once.
//! - Guard rejections never echo the requested path.
//! - Bytes are streamed by `ServeFile`, which guesses the content type and
//!   falls back to `application/octet-stream`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::CONTENT_DISPOSITION},
    response::Response,
};
use dronevault_fsops::FsOpsError;
use dronevault_telemetry::DownloadOutcome;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::http::constants::DOWNLOAD_PREFIX;
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn download_file(
    State(state): State<Arc<ApiState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let raw = request
        .uri()
        .path()
        .strip_prefix(DOWNLOAD_PREFIX)
        .unwrap_or_default()
        .to_string();

    let checked = match state.guard.confine(&raw) {
        Ok(confined) => confined.open_checked().await,
        Err(err) => Err(err),
    };
    let checked = match checked {
        Ok(checked) => checked,
        Err(err) => {
            if let Some(outcome) = download_outcome(&err) {
                state.telemetry.inc_download(outcome);
            }
            return Err(ApiError::from(err));
        }
    };

    debug!(file_name = %checked.file_name, len = checked.len, "serving download");
    let Ok(response) = ServeFile::new(&checked.path).oneshot(request).await;
    let mut response = response.map(axum::body::Body::new);
    if response.status().is_success() {
        state.telemetry.inc_download(DownloadOutcome::Served);
        response
            .headers_mut()
            .insert(CONTENT_DISPOSITION, content_disposition(&checked.file_name));
    }
    Ok(response)
}

const fn download_outcome(err: &FsOpsError) -> Option<DownloadOutcome> {
    match err {
        FsOpsError::PathRejected { .. } => Some(DownloadOutcome::Forbidden),
        FsOpsError::PathMissing { .. } => Some(DownloadOutcome::Missing),
        FsOpsError::Io { .. } | FsOpsError::WorkerUnavailable { .. } => None,
    }
}

/// `attachment` disposition with an ASCII fallback name and, when the name
/// needs it, an RFC 5987 `filename*` parameter.
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|ch| {
            if (ch.is_ascii_graphic() && ch != '"' && ch != '\\') || ch == ' ' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let mut value = format!("attachment; filename=\"{fallback}\"");
    if fallback != file_name {
        value.push_str("; filename*=UTF-8''");
        value.push_str(&urlencoding::encode(file_name));
    }
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
