//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Collector registration stays private; callers see intent-level methods.
//! - The in-flight gauge is driven by an RAII guard so early returns and
//!   panics cannot leave it skewed.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    conversion_stages_total: IntCounterVec,
    conversions_in_flight: IntGauge,
    downloads_total: IntCounterVec,
}

/// Point-in-time view of the conversion and download counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Conversions currently holding a worker permit.
    pub conversions_in_flight: i64,
    /// Files streamed to clients.
    pub downloads_served: u64,
    /// Download requests refused by the path guard.
    pub downloads_forbidden: u64,
    /// Download requests for files that do not exist.
    pub downloads_missing: u64,
}

/// Download request outcomes tracked by `downloads_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File streamed to the client.
    Served,
    /// Path rejected by the guard.
    Forbidden,
    /// Path confined but nothing exists there.
    Missing,
}

impl DownloadOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Served => "served",
            Self::Forbidden => "forbidden",
            Self::Missing => "missing",
        }
    }
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = register(
            &registry,
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            ),
        )?;
        let conversion_stages_total = register(
            &registry,
            "conversion_stages_total",
            IntCounterVec::new(
                Opts::new(
                    "conversion_stages_total",
                    "Conversion pipeline stages executed by outcome",
                ),
                &["stage", "status"],
            ),
        )?;
        let conversions_in_flight = register(
            &registry,
            "conversions_in_flight",
            IntGauge::with_opts(Opts::new(
                "conversions_in_flight",
                "Conversions currently running",
            )),
        )?;
        let downloads_total = register(
            &registry,
            "downloads_total",
            IntCounterVec::new(
                Opts::new("downloads_total", "Download requests by outcome"),
                &["outcome"],
            ),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                conversion_stages_total,
                conversions_in_flight,
                downloads_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Count one execution of a conversion stage (`repair`/`convert`) by status.
    pub fn inc_conversion_stage(&self, stage: &str, status: &str) {
        self.inner
            .conversion_stages_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Count a download request outcome.
    pub fn inc_download(&self, outcome: DownloadOutcome) {
        self.inner
            .downloads_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Mark a conversion as running until the returned guard is dropped.
    #[must_use]
    pub fn track_conversion(&self) -> InFlightGuard {
        self.inner.conversions_in_flight.inc();
        InFlightGuard {
            gauge: self.inner.conversions_in_flight.clone(),
        }
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or produces invalid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsRender {
                reason: "encode",
                source: Box::new(source),
            })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsRender {
            reason: "utf8",
            source: Box::new(source),
        })
    }

    /// Take a point-in-time snapshot for health reporting.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let downloads = |outcome: DownloadOutcome| {
            self.inner
                .downloads_total
                .with_label_values(&[outcome.as_str()])
                .get()
        };
        MetricsSnapshot {
            conversions_in_flight: self.inner.conversions_in_flight.get(),
            downloads_served: downloads(DownloadOutcome::Served),
            downloads_forbidden: downloads(DownloadOutcome::Forbidden),
            downloads_missing: downloads(DownloadOutcome::Missing),
        }
    }
}

/// Decrements `conversions_in_flight` when dropped.
pub struct InFlightGuard {
    gauge: IntGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

fn register<C>(
    registry: &Registry,
    name: &'static str,
    built: std::result::Result<C, prometheus::Error>,
) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    let collector = built.map_err(|source| TelemetryError::MetricSetup {
        name,
        step: "build",
        source,
    })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricSetup {
            name,
            step: "register",
            source,
        })?;
    Ok(collector)
}
