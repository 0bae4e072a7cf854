//! Session bootstrap: cookie acquisition and credential login.
//!
//! [`ApiClient`] owns the HTTP client and a cookie jar shared by every call
//! of one run. Bootstrapping a session is two requests: a `GET /` that lets
//! the platform set its cookies, then a `POST /api/v{n}/auth/login` that
//! trades credentials for a bearer token.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::identity::{ClientIdentity, SUPER_PROPERTIES_HEADER};
use reqwest::cookie::{CookieStore, Jar};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A cookie set by the platform during bootstrap
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

/// Cookies plus the bearer token for one authenticated run
///
/// Lives only as long as the run; nothing here is persisted.
#[derive(Clone)]
pub struct Session {
    cookies: Vec<SessionCookie>,
    token: String,
}

impl Session {
    /// Bundle bootstrap cookies with a login token
    pub fn new(cookies: Vec<SessionCookie>, token: String) -> Self {
        Self { cookies, token }
    }

    /// Cookies acquired during bootstrap
    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// Bearer token, sent verbatim as the `Authorization` header
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cookies", &self.cookies.len())
            .field("token", &"<redacted>")
            .finish()
    }
}

/// JSON body of the login request
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Login name
    pub login: &'a str,
    /// Account password
    pub password: &'a str,
    /// Always `false`
    pub undelete: bool,
    /// Always `null`
    pub login_source: Option<String>,
    /// Always `null`
    pub gift_code_sku_id: Option<String>,
}

impl<'a> LoginRequest<'a> {
    /// Build a plain password login
    pub fn new(login: &'a str, password: &'a str) -> Self {
        Self {
            login,
            password,
            undelete: false,
            login_source: None,
            gift_code_sku_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the platform's web API
///
/// Every request carries the identity's user-agent and the encoded
/// `X-Super-Properties` header. Cookies set by any response are kept in a
/// jar and replayed on later requests.
pub struct ApiClient {
    http: reqwest::Client,
    cookie_jar: Arc<Jar>,
    encoded_identity: String,
    base_url: Url,
    api_version: u32,
}

impl ApiClient {
    /// Create a client for the configured platform
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse, the identity cannot
    /// be encoded, or the HTTP client cannot be built.
    pub fn new(identity: &ClientIdentity, api: &ApiConfig) -> Result<Self> {
        let mut base_url = Url::parse(&api.base_url)?;
        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let cookie_jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .timeout(api.timeout)
            .user_agent(identity.user_agent())
            .cookie_provider(Arc::clone(&cookie_jar))
            .build()?;

        Ok(Self {
            http,
            cookie_jar,
            encoded_identity: identity.encode()?,
            base_url,
            api_version: api.api_version,
        })
    }

    /// Platform root URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path below `/api/v{n}/`
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let relative = format!("api/v{}/{}", self.api_version, path.trim_start_matches('/'));
        Ok(self.base_url.join(&relative)?)
    }

    /// Start a request with the identity header attached
    pub(crate) fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(SUPER_PROPERTIES_HEADER, &self.encoded_identity)
    }

    /// Visit the platform root so it can set session cookies
    ///
    /// Returns the cookies the jar holds for the root URL afterwards. The
    /// response status is not inspected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the request cannot be completed.
    pub async fn acquire_cookies(&self) -> Result<Vec<SessionCookie>> {
        let response = self
            .request(reqwest::Method::GET, self.base_url.clone())
            .send()
            .await?;
        debug!(status = %response.status(), "Bootstrap request completed");

        let cookies = self
            .cookie_jar
            .cookies(&self.base_url)
            .and_then(|header| header.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default();

        for cookie in &cookies {
            debug!(name = %cookie.name, "Received session cookie");
        }

        Ok(cookies)
    }

    /// Exchange credentials for a bearer token
    ///
    /// The HTTP status is not checked; a rejected login is recognised by the
    /// missing token in the response body.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] if the request fails or the body cannot be read
    /// - [`Error::Serialization`] if the body is not JSON
    /// - [`Error::Auth`] if the body has no non-empty `token`
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<String> {
        let url = self.endpoint("auth/login")?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&LoginRequest::new(login, password))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let decoded: LoginResponse = serde_json::from_slice(&body)?;

        match decoded.token {
            Some(token) if !token.is_empty() => {
                debug!(status = %status, "Login returned a token");
                Ok(token)
            }
            _ => Err(Error::Auth(format!(
                "login response (HTTP {}) contained no token{}",
                status.as_u16(),
                decoded
                    .message
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            ))),
        }
    }
}

/// Split a `Cookie` header value ("a=1; b=2") into name/value pairs
fn parse_cookie_header(header: &str) -> Vec<SessionCookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some(SessionCookie {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}
