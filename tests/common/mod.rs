//! Mock chat platform for pipeline tests

use guild_search_dl::config::{Config, Credentials, PacingConfig, SearchConfig};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const SERVER_ID: &str = "880822868907282482";
pub const QUERY: &str = "fries";
pub const TOKEN: &str = "mock.session.token";
pub const SEARCH_PATH: &str = "/api/v9/guilds/880822868907282482/messages/search";

/// Config pointing at `server`, with pacing disabled and output under `dir`
pub fn test_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config {
        credentials: Credentials {
            login: "me@example.com".to_string(),
            password: "correct horse".to_string(),
        },
        search: SearchConfig {
            server_id: SERVER_ID.to_string(),
            query: QUERY.to_string(),
        },
        ..Default::default()
    };
    config.api.base_url = server.uri();
    config.fetch.pacing = PacingConfig::None;
    config.output.path = dir.join("messages.json");
    config
}

/// `GET /` sets a session cookie
pub async fn mount_bootstrap(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "__dcfduid=cookie-value; Path=/"),
        )
        .mount(server)
        .await;
}

/// Login accepts any credentials and returns [`TOKEN`]
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v9/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": TOKEN})))
        .mount(server)
        .await;
}

/// Search serves `total` numbered messages, 25 per page, keyed off `offset`
pub async fn mount_search(server: &MockServer, total: u64) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(move |req: &Request| {
            let offset = offset_of(req).unwrap_or(0);
            let end = (offset + 25).min(total);
            let messages: Vec<_> = (offset..end)
                .map(|i| json!([{"id": i.to_string(), "content": format!("fries #{i}")}]))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({
                "total_results": total,
                "messages": messages
            }))
        })
        .mount(server)
        .await;
}

/// The `offset` query parameter of a recorded request, if present
pub fn offset_of(req: &Request) -> Option<u64> {
    req.url
        .query_pairs()
        .find(|(k, _)| k == "offset")
        .and_then(|(_, v)| v.parse().ok())
}

/// All recorded requests against the search endpoint, in order
pub async fn search_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == SEARCH_PATH)
        .collect()
}
