//! End-to-end export pipeline: cookies, login, paginated search, persist.

use crate::config::Config;
use crate::error::{Error, Stage, StageError};
use crate::fetcher::Fetcher;
use crate::persist::persist_results;
use crate::session::{ApiClient, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What a successful run produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of cookies set during bootstrap
    pub cookies: usize,
    /// Number of messages written
    pub messages: usize,
    /// File the messages were written to
    pub path: PathBuf,
}

/// Run one export with the given configuration
///
/// Stages run in order and the first failure ends the run. Nothing is
/// written unless every search page succeeded; messages collected before a
/// failing page are dropped.
///
/// # Errors
///
/// Returns a [`StageError`] naming the stage that failed and the underlying
/// [`Error`](crate::Error).
pub async fn run_export(config: &Config) -> std::result::Result<ExportSummary, StageError> {
    let at = |stage: Stage| move |source: Error| StageError::new(stage, source);

    config.validate().map_err(at(Stage::Config))?;
    let client =
        Arc::new(ApiClient::new(&config.identity, &config.api).map_err(at(Stage::Config))?);

    let cookies = client
        .acquire_cookies()
        .await
        .map_err(at(Stage::Cookies))?;
    info!(count = cookies.len(), "Acquired session cookies");

    let token = client
        .authenticate(&config.credentials.login, &config.credentials.password)
        .await
        .map_err(at(Stage::Login))?;
    let session = Session::new(cookies, token);
    info!("Obtained authentication token");

    info!(
        server_id = %config.search.server_id,
        query = %config.search.query,
        "Searching messages"
    );
    let fetcher = Fetcher::from_config(client, &config.fetch);
    let results = fetcher
        .fetch_all(
            session.token(),
            &config.search.server_id,
            &config.search.query,
        )
        .await
        .map_err(|partial| {
            warn!(
                discarded = partial.collected.len(),
                offset = partial.offset,
                "Discarding partially collected messages"
            );
            StageError::new(Stage::Search, partial.into_error())
        })?;

    let path = config.output.path.clone();
    persist_results(&results, &path).map_err(at(Stage::Persist))?;
    info!(messages = results.len(), path = %path.display(), "Saved messages");

    Ok(ExportSummary {
        cookies: session.cookies().len(),
        messages: results.len(),
        path,
    })
}
