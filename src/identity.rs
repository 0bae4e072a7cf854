//! Client identity sent with every request
//!
//! The platform expects each request to describe the client environment it
//! came from. The description travels as base64-encoded JSON in the
//! `X-Super-Properties` header, next to a matching `User-Agent`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Header carrying the encoded [`ClientIdentity`]
pub const SUPER_PROPERTIES_HEADER: &str = "X-Super-Properties";

/// Declared client and browser attributes
///
/// Created once at startup (usually from [`Config`](crate::config::Config))
/// and never mutated. Field names serialize in the platform's snake_case
/// schema and in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Operating system name (e.g. "Windows")
    #[serde(default = "default_os")]
    pub os: String,

    /// Browser name (e.g. "Chrome")
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Full user-agent string, also sent as the HTTP `User-Agent`
    #[serde(default = "default_browser_user_agent")]
    pub browser_user_agent: String,

    /// Browser version
    #[serde(default = "default_browser_version")]
    pub browser_version: String,

    /// Operating system version
    #[serde(default = "default_os_version")]
    pub os_version: String,

    /// Referrer URL of the first visit
    #[serde(default)]
    pub referrer: String,

    /// Domain of [`referrer`](Self::referrer)
    #[serde(default)]
    pub referring_domain: String,

    /// Referrer URL of the current visit
    #[serde(default)]
    pub referrer_current: String,

    /// Domain of [`referrer_current`](Self::referrer_current)
    #[serde(default)]
    pub referring_domain_current: String,

    /// Client release channel (default: "stable")
    #[serde(default = "default_release_channel")]
    pub release_channel: String,

    /// Client build number (default: 100000)
    #[serde(default = "default_client_build_number")]
    pub client_build_number: u64,

    /// Event source tag, usually empty
    #[serde(default)]
    pub client_event_source: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            os: default_os(),
            browser: default_browser(),
            browser_user_agent: default_browser_user_agent(),
            browser_version: default_browser_version(),
            os_version: default_os_version(),
            referrer: String::new(),
            referring_domain: String::new(),
            referrer_current: String::new(),
            referring_domain_current: String::new(),
            release_channel: default_release_channel(),
            client_build_number: default_client_build_number(),
            client_event_source: String::new(),
        }
    }
}

impl ClientIdentity {
    /// The HTTP user-agent to send alongside the encoded identity
    pub fn user_agent(&self) -> &str {
        &self.browser_user_agent
    }

    /// Encode the identity for the `X-Super-Properties` header
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) if the
    /// identity cannot be rendered as JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use guild_search_dl::identity::ClientIdentity;
    ///
    /// let encoded = ClientIdentity::default().encode().unwrap();
    /// assert!(!encoded.is_empty());
    /// ```
    pub fn encode(&self) -> crate::Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }
}

fn default_os() -> String {
    "Windows".to_string()
}

fn default_browser() -> String {
    "Chrome".to_string()
}

fn default_browser_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.0.0 Safari/537.36".to_string()
}

fn default_browser_version() -> String {
    "102.0.0.0".to_string()
}

fn default_os_version() -> String {
    "10.0".to_string()
}

fn default_release_channel() -> String {
    "stable".to_string()
}

fn default_client_build_number() -> u64 {
    100_000
}
