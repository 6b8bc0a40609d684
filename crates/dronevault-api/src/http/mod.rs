//! HTTP surface: router, handlers, middleware, and problem responses.

pub(crate) mod constants;
pub(crate) mod conversion;
pub(crate) mod download;
pub(crate) mod errors;
pub(crate) mod health;
pub mod router;
pub(crate) mod sites;
pub(crate) mod telemetry;
