//! Error types shared by the resolver, pipeline, and path guard.
//!
//! # Design
//! - Messages stay constant; the identifying context lives in fields.
//! - Tool diagnostics are carried verbatim so callers can surface them unchanged.

use std::error::Error;

use thiserror::Error;

use crate::model::PipelineStage;

/// Primary error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record or file could not be located.
    #[error("resource not found")]
    NotFound {
        /// Kind of resource that was looked up.
        resource: &'static str,
        /// Identifier used for the lookup when available.
        id: Option<String>,
    },
    /// A caller-supplied path escapes the authorized root.
    #[error("access forbidden")]
    Forbidden {
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// An external tool exited unsuccessfully or could not be launched.
    #[error("external tool failed")]
    ToolFailure {
        /// Pipeline stage that failed.
        stage: PipelineStage,
        /// Raw diagnostic text reported by the tool.
        detail: String,
    },
    /// The record store could not answer the query.
    #[error("record store operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying store failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl CoreError {
    /// Build a not-found error for the supplied resource kind and identifier.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: Some(id.to_string()),
        }
    }

    /// Wrap a store failure with its operation identifier.
    pub fn store(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        Self::Store {
            operation,
            source: Box::new(source),
        }
    }

    /// Returns `true` when the error represents a missing record or file.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias for core operation results.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn core_error_helpers_build_variants() {
        let missing = CoreError::not_found("asset", 42);
        assert!(missing.is_not_found());
        assert!(matches!(
            missing,
            CoreError::NotFound { resource: "asset", id: Some(ref id) } if id == "42"
        ));
        assert_eq!(missing.to_string(), "resource not found");

        let store = CoreError::store("catalog.resolve", io::Error::other("disk gone"));
        assert!(!store.is_not_found());
        assert!(store.source().is_some());
        assert_eq!(store.to_string(), "record store operation failed");
    }

    #[test]
    fn tool_failure_keeps_detail_out_of_message() {
        let err = CoreError::ToolFailure {
            stage: PipelineStage::Repair,
            detail: "ERROR: cannot open file".to_string(),
        };
        assert_eq!(err.to_string(), "external tool failed");
        assert!(err.source().is_none());
    }
}
