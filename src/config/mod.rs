//! Client configuration.
//!
//! [`Config`] is the single record a [`RedditClient`](crate::RedditClient) is
//! built from. The library never reads the environment itself;
//! [`Config::from_env`] exists for the bundled command line tool.

use crate::error::{RedditClientError, Result};
use log::info;
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com";

/// Settings for the optional in-memory response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: Duration::from_secs(30),
        }
    }
}

/// Client configuration.
#[derive(Clone)]
pub struct Config {
    // Reddit API credentials
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,

    // Reddit API settings
    pub user_agent: String,
    pub base_url: String,
    pub auth_url: String,
    pub timeout_seconds: u64,
    pub retries: u32,
    pub check_for_updates: bool,

    // Retry backoff and caching
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub cache: Option<CacheSettings>,
}

/// The validated authentication mode.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Script app: password grant with the account's own login.
    Script {
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
    },
    /// Long-lived refresh token obtained through the code flow.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

impl Credentials {
    pub fn client_id(&self) -> &str {
        match self {
            Credentials::Script { client_id, .. } | Credentials::RefreshToken { client_id, .. } => {
                client_id
            }
        }
    }

    pub fn client_secret(&self) -> &str {
        match self {
            Credentials::Script { client_secret, .. }
            | Credentials::RefreshToken { client_secret, .. } => client_secret,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Credentials::Script {
                client_id,
                username,
                ..
            } => f
                .debug_struct("Script")
                .field("client_id", client_id)
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::RefreshToken { client_id, .. } => f
                .debug_struct("RefreshToken")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            refresh_token: None,
            user_agent: "".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            timeout_seconds: 16,
            retries: 3,
            check_for_updates: false,
            backoff_base: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(32),
            cache: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("retries", &self.retries)
            .field("check_for_updates", &self.check_for_updates)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_cap", &self.backoff_cap)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Config {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }

    pub fn with_script_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_refresh_token(
        mut self,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = client_secret;
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    pub fn with_cache(mut self, settings: CacheSettings) -> Self {
        self.cache = Some(settings);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validate the credential fields and return the auth mode they describe.
    pub fn credentials(&self) -> Result<Credentials> {
        let missing = |what: &str| RedditClientError::ConfigError(format!("{} must be set", what));

        let client_id = self
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing("client_id"))?;
        let client_secret = self.client_secret.clone().unwrap_or_default();

        let script_pair = self.username.is_some() || self.password.is_some();
        match (script_pair, &self.refresh_token) {
            (true, Some(_)) => Err(RedditClientError::ConfigError(
                "supply either username/password or refresh_token, not both".to_string(),
            )),
            (true, None) => {
                let username = self.username.clone().ok_or_else(|| missing("username"))?;
                let password = self.password.clone().ok_or_else(|| missing("password"))?;
                if client_secret.is_empty() {
                    return Err(missing("client_secret for script credentials"));
                }
                Ok(Credentials::Script {
                    client_id,
                    client_secret,
                    username,
                    password,
                })
            }
            (false, Some(refresh_token)) => Ok(Credentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token: refresh_token.clone(),
            }),
            (false, None) => Err(RedditClientError::ConfigError(
                "either username/password or refresh_token must be set".to_string(),
            )),
        }
    }

    /// Check everything a client needs before it is built.
    pub fn validate(&self) -> Result<Credentials> {
        if self.user_agent.trim().is_empty() {
            return Err(RedditClientError::ConfigError(
                "user_agent must be set".to_string(),
            ));
        }
        Url::parse(&self.base_url)?;
        Url::parse(&self.auth_url)?;
        if self.timeout_seconds == 0 {
            return Err(RedditClientError::ConfigError(
                "timeout_seconds must be positive".to_string(),
            ));
        }
        if let Some(cache) = &self.cache {
            if cache.capacity == 0 {
                return Err(RedditClientError::ConfigError(
                    "cache capacity must be positive".to_string(),
                ));
            }
        }
        self.credentials()
    }

    /// Load configuration from `REDDIT_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.client_id = env::var("REDDIT_CLIENT_ID").ok();
        config.client_secret = env::var("REDDIT_CLIENT_SECRET").ok();
        config.username = env::var("REDDIT_USERNAME").ok();
        config.password = env::var("REDDIT_PASSWORD").ok();
        config.refresh_token = env::var("REDDIT_REFRESH_TOKEN").ok();

        if let Ok(user_agent) = env::var("REDDIT_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Ok(base_url) = env::var("REDDIT_BASE_URL") {
            config.base_url = base_url;
        }

        // Numeric settings fall back to defaults when unparseable
        if let Ok(timeout_str) = env::var("REDDIT_TIMEOUT") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                config.timeout_seconds = timeout;
            }
        }

        if let Ok(retries_str) = env::var("REDDIT_RETRIES") {
            if let Ok(retries) = retries_str.parse::<u32>() {
                config.retries = retries;
            }
        }

        info!("Loaded configuration from environment: {:?}", config);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Config {
        Config::new("test agent").with_script_credentials("id", "secret", "user", "pass")
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::new("ua");
        assert_eq!(config.base_url, "https://oauth.reddit.com");
        assert_eq!(config.timeout_seconds, 16);
        assert_eq!(config.retries, 3);
        assert!(!config.check_for_updates);
        assert!(config.cache.is_none());
    }

    #[test]
    fn script_credentials_validate() {
        let creds = script().validate().unwrap();
        assert!(matches!(creds, Credentials::Script { .. }));
        assert_eq!(creds.client_id(), "id");
    }

    #[test]
    fn refresh_token_credentials_validate_without_secret() {
        let creds = Config::new("ua")
            .with_refresh_token("id", None, "rt")
            .validate()
            .unwrap();
        assert!(matches!(creds, Credentials::RefreshToken { .. }));
        assert_eq!(creds.client_secret(), "");
    }

    #[test]
    fn conflicting_or_missing_credentials_fail() {
        let mut both = script();
        both.refresh_token = Some("rt".into());
        assert!(matches!(both.validate(), Err(RedditClientError::ConfigError(_))));

        let neither = Config::new("ua");
        assert!(neither.credentials().is_err());

        let mut half = script();
        half.password = None;
        assert!(half.validate().is_err());
    }

    #[test]
    fn empty_user_agent_is_rejected() {
        let mut config = script();
        config.user_agent = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", script());
        assert!(!rendered.contains("\"secret\""));
        assert!(!rendered.contains("\"pass\""));
        assert!(rendered.contains("<redacted>"));
    }
}
