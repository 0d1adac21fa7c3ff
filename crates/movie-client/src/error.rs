//! Error types for the movie-client crate.
//!
//! Every failure the recommendation service can produce collapses into one
//! of these variants. Callers above this crate treat them all as a single
//! "transport/server failure" category; the variants exist for logging.

use thiserror::Error;

/// Errors that can occur when talking to the recommendation service
#[derive(Error, Debug)]
pub enum ClientError {
    /// The configured base URL could not be parsed or cannot carry paths
    #[error("Invalid service URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The underlying HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request never produced a response (connection refused, reset, ...)
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status code
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },

    /// The response body was not a JSON array of movies
    #[error("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ClientError>;
