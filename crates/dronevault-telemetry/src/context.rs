//! Process and request context carried through tracing spans.
//!
//! The request context lives in task-local storage so code far from the HTTP
//! layer (for example the conversion worker) can tag its logs with the
//! originating request.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the process-level span entered for the lifetime of the guard.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter a `dronevault` span carrying the service role and build SHA.
    #[must_use]
    pub fn new(role: &str) -> Self {
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "dronevault",
            role = %role,
            build_sha = %build_sha()
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Identifiers of the HTTP request currently being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

impl RequestContext {
    /// Build a context from the request identifier and matched route.
    #[must_use]
    pub fn new(request_id: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            route: Arc::from(route.into()),
        }
    }

    /// Value of the `x-request-id` header.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Matched route template (for example `/download_file/{*path}`).
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }
}

tokio::task_local! {
    static ACTIVE_REQUEST: RequestContext;
}

/// Run `fut` with `context` available through [`current_request`].
pub async fn with_request_context<Fut, T>(context: RequestContext, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    ACTIVE_REQUEST.scope(context, fut).await
}

/// Context of the request being served by the current task, if any.
#[must_use]
pub fn current_request() -> Option<RequestContext> {
    ACTIVE_REQUEST.try_with(Clone::clone).ok()
}

/// Identifier of the request being served by the current task, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST
        .try_with(|ctx| ctx.request_id().to_string())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_guard_can_be_entered_and_dropped() {
        let guard = GlobalContextGuard::new("test");
        drop(guard);
    }

    #[tokio::test]
    async fn request_context_is_scoped_to_the_future() {
        let seen = with_request_context(
            RequestContext::new("req-7", "/process_pointcloud/{asset_id}"),
            async {
                let ctx = current_request();
                assert_eq!(
                    ctx.as_ref().map(RequestContext::route),
                    Some("/process_pointcloud/{asset_id}")
                );
                current_request_id()
            },
        )
        .await;
        assert_eq!(seen.as_deref(), Some("req-7"));
        assert!(current_request().is_none());
    }
}
