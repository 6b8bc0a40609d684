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
#![allow(clippy::module_name_repetitions)]

//! Domain types shared by the Dronevault services.
//!
//! Layout: `model/` (survey catalog records, pipeline outcomes), `service/`
//! (catalog trait consumed by the HTTP layer), `error.rs` (shared taxonomy).

pub mod error;
pub mod model;
pub mod service;

pub use error::{CoreError, CoreResult};
pub use model::{
    AssetId, Centroid, ConversionOutcome, PipelineStage, ProductKind, ProductRecord,
    SiteId, SiteRecord,
};
pub use service::AssetCatalog;
