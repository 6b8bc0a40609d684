//! Errors raised while assembling or running the HTTP server.

use std::io;
use std::net::SocketAddr;

use dronevault_fsops::FsOpsError;
use thiserror::Error;

/// Failures constructing or hosting the API server.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// The configured download root cannot back a path guard.
    #[error("invalid download root")]
    DownloadRoot {
        /// Underlying guard error.
        #[source]
        source: FsOpsError,
    },
    /// The listener could not bind.
    #[error("failed to bind http listener")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server stopped with an IO error.
    #[error("http server terminated unexpectedly")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Convenience alias for server results.
pub type ApiServerResult<T> = Result<T, ApiServerError>;
