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

//! Shared test helpers used across integration suites.
//! Layout: catalog.rs (seeded `SQLite` catalogs), fixtures.rs (survey trees, fake tools), mocks.rs (recording tool runner).

pub mod catalog;
pub mod fixtures;
pub mod mocks;

pub use catalog::TestCatalog;
pub use fixtures::SurveyTree;
pub use mocks::{RecordingToolRunner, ScriptedReply};
