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

//! Filesystem-facing services: download path confinement and the
//! repair-then-convert pipeline for point clouds.
//!
//! Layout: `guard.rs` (path confinement), `runner.rs` (external tools),
//! `pipeline.rs` (two-stage conversion), `worker.rs` (bounded job execution).

pub mod error;
pub mod guard;
pub mod pipeline;
pub mod runner;
pub mod worker;

pub use error::{FsOpsError, FsOpsResult, ToolError};
pub use guard::{CheckedFile, ConfinedPath, PathGuard, confine};
pub use pipeline::{
    ConversionPipeline, ConversionRequest, HEALTH_COMPONENT, ToolPrograms, ViewerTarget,
};
pub use runner::{ProcessToolRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use worker::ConversionWorker;
