//! OAuth2 bearer tokens.
//!
//! The [`Authenticator`] hands out the current access token and refreshes it
//! when it is about to expire or after the server rejected it. At most one
//! refresh is in flight: concurrent callers that find a refresh running wait
//! for it and then all observe the same new token.

use crate::cancel::CancelToken;
use crate::config::Credentials;
use crate::error::{RedditClientError, Result};
use crate::transport::{HttpRequest, HttpTransport};
use crate::util::url_join;
use log::{debug, warn};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Tokens with this little life left are refreshed before use.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const TOKEN_PATH: &str = "api/v1/access_token";

/// Body of an `access_token` reply.
#[derive(Deserialize)]
struct TokenReply {
    access_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    refresh_token: Option<String>,
    /// A string code, or the HTTP status as a number.
    error: Option<serde_json::Value>,
}

/// A bearer token and the local clock reading at which it expires.
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: Instant,
    pub scope: Option<String>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Instant::now() + expires_in,
            scope: None,
        }
    }

    pub fn is_access_token_valid(&self) -> bool {
        self.expires_at.saturating_duration_since(Instant::now()) > EXPIRY_MARGIN
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Observable phase of the authenticator.
#[derive(Debug, Clone)]
pub enum AuthState {
    Unauthenticated,
    Authenticated(AccessToken),
    Refreshing,
    Failed(String),
}

impl AuthState {
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticated(_) => "authenticated",
            AuthState::Refreshing => "refreshing",
            AuthState::Failed(_) => "failed",
        }
    }
}

struct Inner {
    state: AuthState,
    // Reddit may rotate the refresh token on use
    refresh_token: Option<String>,
}

pub struct Authenticator {
    credentials: Credentials,
    token_url: String,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
    inner: Mutex<Inner>,
    refreshed: Notify,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("credentials", &self.credentials)
            .field("token_url", &self.token_url)
            .field("state", &self.lock().state.name())
            .finish()
    }
}

enum Step {
    Ready(String),
    Wait,
    Refresh,
}

/// Puts the authenticator back into a usable state if the refreshing caller
/// is cancelled (its future dropped) before the refresh completes.
struct RefreshGuard<'a> {
    auth: &'a Authenticator,
    armed: bool,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.auth.lock();
            if matches!(inner.state, AuthState::Refreshing) {
                inner.state = AuthState::Unauthenticated;
            }
            drop(inner);
            self.auth.refreshed.notify_waiters();
        }
    }
}

impl Authenticator {
    pub fn new(
        credentials: Credentials,
        auth_url: &str,
        timeout: Duration,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let refresh_token = match &credentials {
            Credentials::RefreshToken { refresh_token, .. } => Some(refresh_token.clone()),
            Credentials::Script { .. } => None,
        };
        Self {
            credentials,
            token_url: url_join(auth_url, TOKEN_PATH),
            timeout,
            transport,
            inner: Mutex::new(Inner {
                state: AuthState::Unauthenticated,
                refresh_token,
            }),
            refreshed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> AuthState {
        self.lock().state.clone()
    }

    /// Install a known token, e.g. one kept from an earlier session.
    pub fn seed(&self, access_token: impl Into<String>, expires_in: Duration) {
        self.lock().state = AuthState::Authenticated(AccessToken::new(access_token, expires_in));
    }

    /// Mark `rejected` as unusable after the server answered 401. A token
    /// that was already replaced by a concurrent refresh is left alone.
    pub fn invalidate(&self, rejected: &str) {
        let mut inner = self.lock();
        if let AuthState::Authenticated(token) = &inner.state {
            if token.access_token == rejected {
                debug!("Access token rejected by server, forcing refresh");
                inner.state = AuthState::Unauthenticated;
            }
        }
    }

    /// Return a usable access token, refreshing first when needed.
    pub async fn authorize(&self, cancel: &CancelToken) -> Result<String> {
        let mut waited = false;
        loop {
            let notified = self.refreshed.notified();
            let step = {
                let mut inner = self.lock();
                match &inner.state {
                    AuthState::Authenticated(token) if token.is_access_token_valid() => {
                        Step::Ready(token.access_token.clone())
                    }
                    AuthState::Refreshing => Step::Wait,
                    AuthState::Failed(reason) if waited => {
                        return Err(RedditClientError::AuthError(reason.clone()));
                    }
                    _ => {
                        inner.state = AuthState::Refreshing;
                        Step::Refresh
                    }
                }
            };

            match step {
                Step::Ready(token) => return Ok(token),
                Step::Wait => {
                    debug!("Waiting for in-flight token refresh");
                    waited = true;
                    cancel.run(notified).await?;
                }
                Step::Refresh => return self.refresh(cancel).await,
            }
        }
    }

    /// Attach `Authorization: Bearer <token>` to `request`.
    pub async fn authorize_request(
        &self,
        request: &mut HttpRequest,
        cancel: &CancelToken,
    ) -> Result<String> {
        let token = self.authorize(cancel).await?;
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| RedditClientError::AuthError("token is not a valid header".to_string()))?;
        request.headers.insert(AUTHORIZATION, value);
        Ok(token)
    }

    async fn refresh(&self, cancel: &CancelToken) -> Result<String> {
        let mut guard = RefreshGuard {
            auth: self,
            armed: true,
        };
        let outcome = cancel.run(self.request_token()).await;
        guard.armed = false;

        let mut inner = self.lock();
        let result = match outcome {
            Ok(Ok((token, rotated))) => {
                let access_token = token.access_token.clone();
                inner.state = AuthState::Authenticated(token);
                if rotated.is_some() {
                    inner.refresh_token = rotated;
                }
                debug!("Access token refreshed successfully");
                Ok(access_token)
            }
            Ok(Err(err)) => {
                warn!("Token refresh failed: {}", err);
                inner.state = AuthState::Failed(err.to_string());
                Err(err)
            }
            Err(cancelled) => {
                inner.state = AuthState::Unauthenticated;
                Err(cancelled)
            }
        };
        drop(inner);
        self.refreshed.notify_waiters();
        result
    }

    /// Run the grant for the configured credentials against the token
    /// endpoint. Returns the token and, if Reddit rotated it, the new
    /// refresh token.
    async fn request_token(&self) -> Result<(AccessToken, Option<String>)> {
        let params: Vec<(String, String)> = match &self.credentials {
            Credentials::Script {
                username, password, ..
            } => vec![
                ("grant_type".into(), "password".into()),
                ("username".into(), username.clone()),
                ("password".into(), password.clone()),
            ],
            Credentials::RefreshToken { .. } => {
                let refresh_token = self.lock().refresh_token.clone().ok_or_else(|| {
                    RedditClientError::AuthError("No refresh token available".to_string())
                })?;
                vec![
                    ("grant_type".into(), "refresh_token".into()),
                    ("refresh_token".into(), refresh_token),
                ]
            }
        };

        debug!("Requesting access token from {}", self.token_url);
        let auth = base64::encode(format!(
            "{}:{}",
            self.credentials.client_id(),
            self.credentials.client_secret()
        ));
        let mut request = HttpRequest::new(Method::POST, self.token_url.clone());
        request.form = params;
        request.timeout = self.timeout;
        request.headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", auth)).map_err(|_| {
                RedditClientError::ConfigError("client id is not header-safe".to_string())
            })?,
        );

        let res = self.transport.send(request).await?;

        // Check for HTTP errors
        if !res.status.is_success() {
            return Err(RedditClientError::AuthError(format!(
                "token request failed: HTTP {}",
                res.status
            )));
        }

        let reply: TokenReply = serde_json::from_str(&res.body).map_err(|e| {
            RedditClientError::AuthError(format!("token response is not JSON: {}", e))
        })?;

        // Reddit reports bad logins with a 200 and an `error` field
        if let Some(error) = reply.error {
            let reason = match error {
                serde_json::Value::String(code) => code,
                other => other.to_string(),
            };
            return Err(RedditClientError::AuthError(reason));
        }

        let token = reply.access_token.ok_or_else(|| {
            RedditClientError::AuthError("Failed to extract access token from response".to_string())
        })?;
        let expires_in = reply.expires_in.unwrap_or(3600);

        Ok((
            AccessToken {
                access_token: token,
                expires_at: Instant::now() + Duration::from_secs(expires_in),
                scope: reply.scope,
            },
            reply.refresh_token,
        ))
    }
}
