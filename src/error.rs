//! Error types for the stress tool
//!
//! Only two error classes are fatal: invalid configuration (detected before
//! any request is issued) and an HTTP transport that cannot be constructed
//! at all. Everything that happens per-request is classified into an
//! [`Outcome`](crate::model::Outcome) instead and never unwinds.

use thiserror::Error;

/// Unified error type for the stress tool
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP transport unavailable: {0}")]
    TransportUnavailable(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Process exit code for this error class
    ///
    /// Mirrors the tool's contract: 2 for configuration problems, 1 when the
    /// HTTP client itself cannot run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration(_) => 2,
            Error::TransportUnavailable(_) | Error::Internal(_) => 1,
        }
    }
}

/// Result type alias for the stress tool
pub type Result<T> = std::result::Result<T, Error>;
