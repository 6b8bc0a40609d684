//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while wiring logging or metrics.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber is already installed or could not be set.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// `DRONEVAULT_LOG_FORMAT` held something other than `pretty` or `json`.
    UnknownLogFormat {
        /// Value that failed to parse.
        value: String,
    },
    /// A metric could not be built or added to the registry.
    MetricSetup {
        /// Metric name.
        name: &'static str,
        /// `build` or `register`.
        step: &'static str,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// The `/metrics` exposition could not be produced.
    MetricsRender {
        /// `encode` or `utf8`.
        reason: &'static str,
        /// Underlying encoder or conversion error.
        source: Box<dyn Error + Send + Sync>,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::SubscriberInstall { .. } => "tracing subscriber install failed",
            Self::UnknownLogFormat { .. } => "unrecognised log format",
            Self::MetricSetup { .. } => "metric setup failed",
            Self::MetricsRender { .. } => "metrics rendering failed",
        };
        formatter.write_str(message)
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::UnknownLogFormat { .. } => None,
            Self::MetricSetup { source, .. } => Some(source),
            Self::MetricsRender { source, .. } => Some(source.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_errors_keep_their_source() {
        let setup = TelemetryError::MetricSetup {
            name: "downloads_total",
            step: "register",
            source: prometheus::Error::AlreadyReg,
        };
        assert_eq!(setup.to_string(), "metric setup failed");
        assert!(setup.source().is_some());

        let render = TelemetryError::MetricsRender {
            reason: "utf8",
            source: Box::new(std::io::Error::other("bad bytes")),
        };
        assert_eq!(render.to_string(), "metrics rendering failed");
        assert!(render.source().is_some());
    }

    #[test]
    fn unknown_log_format_has_no_source() {
        let format = TelemetryError::UnknownLogFormat {
            value: "xml".to_string(),
        };
        assert_eq!(format.to_string(), "unrecognised log format");
        assert!(format.source().is_none());
    }
}
