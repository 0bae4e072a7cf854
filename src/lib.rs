//! # guild-search-dl
//!
//! Collects every message matching a guild full-text search on a chat
//! platform's web API and writes them to a single JSON file.
//!
//! ## Overview
//!
//! A run has four stages:
//! 1. **Bootstrap** - visit the platform root to obtain session cookies
//! 2. **Login** - trade a username and password for a bearer token
//! 3. **Fetch** - page through the search endpoint, 25 results at a time,
//!    pausing between requests, until the reported total is reached
//! 4. **Persist** - validate and write the collected messages as compact JSON
//!
//! Message records are kept as opaque [`serde_json::Value`]s; nothing in the
//! crate depends on the platform's message schema.
//!
//! ## Quick Start
//!
//! ```no_run
//! use guild_search_dl::{Config, run_export};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.credentials.login = "me@example.com".to_string();
//!     config.credentials.password = "correct horse".to_string();
//!     config.search.server_id = "880822868907282482".to_string();
//!     config.search.query = "fries".to_string();
//!
//!     let summary = run_export(&config).await?;
//!     println!("saved {} messages to {}", summary.messages, summary.path.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// End-to-end export pipeline
pub mod export;
/// Paginated fetch orchestration
pub mod fetcher;
/// Client identity header
pub mod identity;
/// Request pacing policies
pub mod pacing;
/// Result file persistence
pub mod persist;
/// Search endpoint client
pub mod search;
/// Session bootstrap and login
pub mod session;

// Re-export commonly used types
pub use config::{
    ApiConfig, Config, Credentials, FetchConfig, OutputConfig, PacingConfig, SearchConfig,
};
pub use error::{Error, PartialFetch, Result, Stage, StageError};
pub use export::{ExportSummary, run_export};
pub use fetcher::{FetchLimits, Fetcher, PAGE_SIZE, ResultSet};
pub use identity::ClientIdentity;
pub use pacing::{FixedDelay, NoDelay, PacingPolicy, RequestRateLimiter};
pub use persist::{load_results, persist, persist_results};
pub use search::{SearchPage, SearchSource};
pub use session::{ApiClient, Session, SessionCookie};
