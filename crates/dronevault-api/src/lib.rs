#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! HTTP API for Dronevault.
//!
//! Routes:
//! - `GET /process_pointcloud/{asset_id}`: convert a point cloud and redirect to its viewer page.
//! - `GET /download_file/{*path}`: stream a file confined to the download root.
//! - `GET /v1/sites`, `GET /v1/sites/{site_id}`: site catalog with product links.
//! - `GET /health`, `GET /metrics`: diagnostics.

pub mod error;
pub mod http;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::{ApiDependencies, ApiServer};
