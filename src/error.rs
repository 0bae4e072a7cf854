//! Error types for guild-search-dl
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are passed
//! up the call chain unchanged; the binary decides that all of them are fatal.
//! The variants follow the failure classes a run can hit:
//! - transport failures on any HTTP call ([`Error::Network`])
//! - response bodies that are not the expected JSON ([`Error::Serialization`])
//! - login responses without a usable token ([`Error::Auth`])
//! - file system failures while persisting ([`Error::Io`])

use crate::fetcher::ResultSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for guild-search-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for guild-search-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// Network error (connection, DNS, TLS, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response or payload was not valid JSON, or lacked expected fields
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Login succeeded at the transport level but returned no usable token
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A URL could not be built from the configured base URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured page or time bound stopped pagination before the
    /// server reported completion
    #[error("fetch limit reached after {pages} pages in {elapsed:?} ({limit})")]
    FetchLimit {
        /// Number of search requests issued before stopping
        pages: u32,
        /// Wall-clock time spent paginating
        elapsed: Duration,
        /// Which bound tripped, e.g. "max_pages = 40"
        limit: String,
    },
}

/// A fetch that stopped early
///
/// Carries every message collected before the failing request so callers can
/// decide whether partial data is acceptable. The underlying cause is exposed
/// through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("fetch stopped at offset {offset} after collecting {} messages: {source}", .collected.len())]
pub struct PartialFetch {
    /// Messages collected before the failure, in arrival order
    pub collected: ResultSet,
    /// Offset of the request that failed (or would have been issued next)
    pub offset: u64,
    /// The error that ended pagination
    #[source]
    pub source: Error,
}

impl PartialFetch {
    /// Discard the partial messages and keep only the cause
    pub fn into_error(self) -> Error {
        self.source
    }
}

/// Pipeline stage a run was in when it failed
///
/// Used by the binary to name the failing step in its diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Loading or validating configuration
    Config,
    /// Bootstrapping session cookies
    Cookies,
    /// Exchanging credentials for a token
    Login,
    /// Paginating the search endpoint
    Search,
    /// Writing the results file
    Persist,
}

impl Stage {
    /// Short lowercase label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Cookies => "cookies",
            Stage::Login => "login",
            Stage::Search => "search",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error tagged with the pipeline stage it happened in
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    /// Where the run failed
    pub stage: Stage,
    /// What went wrong
    #[source]
    pub source: Error,
}

impl StageError {
    /// Tag `source` with `stage`
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }
}
