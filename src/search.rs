//! Search client: one paginated request against the guild search endpoint.

use crate::error::Result;
use crate::session::ApiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One server response to a search request
///
/// Both fields default when absent, so an error body such as
/// `{"message": "Unknown Guild", "code": 10004}` decodes as an empty page
/// with `total_results == 0`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total number of matches the server reports for the query
    #[serde(default)]
    pub total_results: u64,

    /// Message records on this page, passed through without interpretation
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// Something that can answer paginated search requests
///
/// [`ApiClient`] is the production implementation; the
/// [`Fetcher`](crate::fetcher::Fetcher) only depends on this trait.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Fetch the page of results starting at `offset`
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer token, sent verbatim as `Authorization`
    /// * `server_id` - Guild to search in
    /// * `query` - Full-text query
    /// * `offset` - Zero-based index of the first result to return
    async fn search(
        &self,
        token: &str,
        server_id: &str,
        query: &str,
        offset: u64,
    ) -> Result<SearchPage>;
}

#[async_trait]
impl SearchSource for ApiClient {
    /// Issue `GET /api/v{n}/guilds/{server_id}/messages/search`
    ///
    /// `content` is always sent; `offset` only when non-zero. The status code
    /// is not interpreted beyond a warning in the log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) on transport
    /// failure and [`Error::Serialization`](crate::Error::Serialization) if
    /// the body is not a JSON object.
    async fn search(
        &self,
        token: &str,
        server_id: &str,
        query: &str,
        offset: u64,
    ) -> Result<SearchPage> {
        let url = self.endpoint(&format!("guilds/{}/messages/search", server_id))?;

        let mut request = self
            .request(reqwest::Method::GET, url)
            .header(reqwest::header::AUTHORIZATION, token)
            .query(&[("content", query)]);
        if offset != 0 {
            request = request.query(&[("offset", offset)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                offset, "Search returned a non-success status"
            );
        }

        let body = response.bytes().await?;
        let page: SearchPage = serde_json::from_slice(&body)?;

        debug!(
            offset,
            total_results = page.total_results,
            returned = page.messages.len(),
            "Decoded search page"
        );

        Ok(page)
    }
}
