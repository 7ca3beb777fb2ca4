/// Client configuration for the Jito block-engine JSON-RPC API.
///
/// A [`ClientConfig`] is built once and handed to the transport, which owns
/// it for the rest of its life.  Nothing downstream can change the endpoint
/// or the access token after construction.
use std::env;
use std::time::Duration;

// ─── Well-known endpoints ───────────────────────────────────────────────────

/// Jito block-engine API base URLs.
pub mod endpoints {
    /// Mainnet block-engine (primary).
    pub const MAINNET: &str = "https://mainnet.block-engine.jito.wtf/api/v1";
    /// Amsterdam region.
    pub const AMSTERDAM: &str = "https://amsterdam.mainnet.block-engine.jito.wtf/api/v1";
    /// Frankfurt region.
    pub const FRANKFURT: &str = "https://frankfurt.mainnet.block-engine.jito.wtf/api/v1";
    /// New York region.
    pub const NY: &str = "https://ny.mainnet.block-engine.jito.wtf/api/v1";
    /// Tokyo region.
    pub const TOKYO: &str = "https://tokyo.mainnet.block-engine.jito.wtf/api/v1";
    /// Salt Lake City region.
    pub const SLC: &str = "https://slc.mainnet.block-engine.jito.wtf/api/v1";
    /// Testnet block-engine.
    pub const TESTNET: &str = "https://dallas.testnet.block-engine.jito.wtf/api/v1";

    /// Resource path for bundle methods.
    pub const BUNDLES_PATH: &str = "/bundles";
    /// Resource path for single-transaction methods.
    pub const TRANSACTIONS_PATH: &str = "/transactions";
}

/// Environment variable holding the block-engine base URL.
pub const ENV_JITO_URL: &str = "JITO_URL";
/// Environment variable holding the optional access token.
pub const ENV_JITO_UUID: &str = "JITO_UUID";

/// Per-request timeout unless the caller picks another.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Configuration ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://mainnet.block-engine.jito.wtf/api/v1`.
    pub base_url: String,
    /// Access token sent as `x-jito-auth` and `?uuid=`.
    pub uuid: Option<String>,
    /// Per-request timeout.  `None` waits for as long as the server takes.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: endpoints::MAINNET.to_string(),
            uuid: None,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, uuid: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            uuid: normalize_token(uuid),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Read `JITO_URL` / `JITO_UUID`, falling back to mainnet without a token.
    pub fn from_env() -> Self {
        let base_url = env::var(ENV_JITO_URL).unwrap_or_else(|_| endpoints::MAINNET.to_string());
        let uuid = env::var(ENV_JITO_UUID).ok();
        Self::new(base_url, uuid)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn normalize_token(uuid: Option<String>) -> Option<String> {
    uuid.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_mainnet() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url, endpoints::MAINNET);
        assert!(cfg.uuid.is_none());
        assert_eq!(cfg.request_timeout, Some(DEFAULT_REQUEST_TIMEOUT));
    }

    #[test]
    fn from_env_reads_url_and_token() {
        // The only test that touches these variables.
        env::set_var(ENV_JITO_URL, endpoints::NY);
        env::set_var(ENV_JITO_UUID, "env-uuid");
        let cfg = ClientConfig::from_env();
        assert_eq!(cfg.base_url, endpoints::NY);
        assert_eq!(cfg.uuid.as_deref(), Some("env-uuid"));

        env::remove_var(ENV_JITO_URL);
        env::set_var(ENV_JITO_UUID, "");
        let cfg = ClientConfig::from_env();
        assert_eq!(cfg.base_url, endpoints::MAINNET);
        assert!(cfg.uuid.is_none());

        env::remove_var(ENV_JITO_UUID);
    }

    #[test]
    fn empty_token_is_dropped() {
        let cfg = ClientConfig::new(endpoints::TOKYO, Some("  ".into()));
        assert!(cfg.uuid.is_none());

        let cfg = ClientConfig::new(endpoints::TOKYO, Some("my-uuid".into()));
        assert_eq!(cfg.uuid.as_deref(), Some("my-uuid"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let cfg = ClientConfig::new("http://localhost:8080/api/v1/", None);
        assert_eq!(cfg.trimmed_base_url(), "http://localhost:8080/api/v1");
    }

    #[test]
    fn with_timeout_sets_request_timeout() {
        let cfg = ClientConfig::default().with_timeout(Duration::from_secs(3));
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn endpoints_are_correct() {
        assert!(endpoints::MAINNET.contains("mainnet.block-engine.jito.wtf"));
        assert!(endpoints::AMSTERDAM.contains("amsterdam"));
        assert!(endpoints::FRANKFURT.contains("frankfurt"));
        assert!(endpoints::NY.contains("ny"));
        assert!(endpoints::TOKYO.contains("tokyo"));
        assert!(endpoints::SLC.contains("slc"));
        assert_eq!(endpoints::BUNDLES_PATH, "/bundles");
    }
}
