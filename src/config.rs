//! Configuration types for guild-search-dl

use crate::error::{Error, Result};
use crate::identity::ClientIdentity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Remote API location and HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Platform root URL (default: "https://discord.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// REST API version used in endpoint paths (default: 9)
    #[serde(default = "default_api_version")]
    pub api_version: u32,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout: default_timeout(),
        }
    }
}

/// Account credentials exchanged for a bearer token
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name (usually the account email)
    #[serde(default)]
    pub login: String,

    /// Account password
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What to search for
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Guild (server) ID to search in
    #[serde(default)]
    pub server_id: String,

    /// Full-text query sent as the `content` parameter
    #[serde(default)]
    pub query: String,
}

/// How requests are spaced between pages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PacingConfig {
    /// Sleep a fixed interval between pages
    Fixed {
        /// Delay in milliseconds (default: 1000)
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
    /// No delay at all
    None,
    /// Token bucket allowing a steady number of requests per second
    RateLimited {
        /// Sustained request rate
        requests_per_second: u64,
    },
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig::Fixed {
            delay_ms: default_delay_ms(),
        }
    }
}

/// Pagination behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Messages the server returns per page (default: 25)
    ///
    /// Offsets advance by this amount regardless of how many messages a page
    /// actually contained.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Spacing between consecutive search requests
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Stop with an error after this many search requests (None = unbounded)
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Stop with an error once pagination has run this long (None = unbounded)
    #[serde(default, with = "optional_duration_serde")]
    pub max_duration: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            pacing: PacingConfig::default(),
            max_pages: None,
            max_duration: None,
        }
    }
}

/// Where results are written
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file, overwritten on every successful run (default: "messages.json")
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

/// Main configuration for a search export run
///
/// Every section is optional in the JSON file; missing sections take their
/// defaults. Credentials and the search target are usually supplied on the
/// command line instead.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Client identity announced with every request
    #[serde(default)]
    pub identity: ClientIdentity,

    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Account credentials
    #[serde(default)]
    pub credentials: Credentials,

    /// Search target
    #[serde(default)]
    pub search: SearchConfig,

    /// Pagination settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// The result is not validated; call [`Config::validate`] once any
    /// command-line overrides have been applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::Serialization`] if it is not valid configuration JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Check that the configuration can drive a run
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(config_error("base_url must not be empty", "api.base_url"));
        }
        url::Url::parse(&self.api.base_url).map_err(|e| Error::Config {
            message: format!("base_url is not a valid URL: {}", e),
            key: Some("api.base_url".to_string()),
        })?;

        if self.credentials.login.is_empty() {
            return Err(config_error("login must be set", "credentials.login"));
        }
        if self.credentials.password.is_empty() {
            return Err(config_error("password must be set", "credentials.password"));
        }

        if self.search.server_id.trim().is_empty() {
            return Err(config_error("server_id must be set", "search.server_id"));
        }
        if self.search.query.is_empty() {
            return Err(config_error("query must not be empty", "search.query"));
        }

        if self.fetch.page_size == 0 {
            return Err(config_error(
                "page_size must be greater than 0",
                "fetch.page_size",
            ));
        }
        if let PacingConfig::RateLimited {
            requests_per_second: 0,
        } = self.fetch.pacing
        {
            return Err(config_error(
                "requests_per_second must be greater than 0",
                "fetch.pacing.requests_per_second",
            ));
        }
        if self.fetch.max_pages == Some(0) {
            return Err(config_error(
                "max_pages must be greater than 0 when set",
                "fetch.max_pages",
            ));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(config_error("output path must not be empty", "output.path"));
        }

        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_base_url() -> String {
    "https://discord.com".to_string()
}

fn default_api_version() -> u32 {
    9
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_page_size() -> u64 {
    crate::fetcher::PAGE_SIZE
}

fn default_output_path() -> PathBuf {
    PathBuf::from("messages.json")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
