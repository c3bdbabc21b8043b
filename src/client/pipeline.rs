//! The request pipeline: URL resolution, rate limiting, authorization,
//! dispatch, and response classification with retries.

use super::request::{Endpoint, Request};
use crate::auth::Authenticator;
use crate::cancel::CancelToken;
use crate::config::{Config, Credentials};
use crate::endpoints::UrlRegistry;
use crate::error::{ApiError, ErrorItem, RedditClientError, Result};
use crate::ratelimit::{RateLimiter, RESET_HEADER};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use log::{debug, warn};
use rand::Rng;
use reqwest::header::{HeaderValue, LOCATION, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// What to do with a response.
enum Outcome {
    Done(Value),
    Unauthorized,
    RateLimited(Option<Duration>),
    ServerError(StatusCode),
    Fail(RedditClientError),
}

pub struct RequestPipeline {
    registry: UrlRegistry,
    transport: Arc<dyn HttpTransport>,
    limiter: RateLimiter,
    auth: Authenticator,
    user_agent: String,
    timeout: Duration,
    retries: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl RequestPipeline {
    pub fn new(
        config: &Config,
        credentials: Credentials,
        user_agent: String,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let auth = Authenticator::new(
            credentials,
            &config.auth_url,
            config.timeout(),
            Arc::clone(&transport),
        );
        Ok(Self {
            registry: UrlRegistry::new(&config.base_url)?,
            transport,
            limiter: RateLimiter::new(),
            auth,
            user_agent,
            timeout: config.timeout(),
            retries: config.retries,
            backoff_base: config.backoff_base,
            backoff_cap: config.backoff_cap,
        })
    }

    pub fn registry(&self) -> &UrlRegistry {
        &self.registry
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// The absolute URL `request` will be sent to.
    pub fn resolve(&self, request: &Request) -> Result<String> {
        match &request.endpoint {
            Endpoint::Named(name) => self.registry.format(name, &request.path_args),
            Endpoint::Path(path) => self.registry.resolve_path(path, &request.path_args),
        }
    }

    /// Query pairs actually sent for `request`: its parameters, plus the form
    /// data for non-mutating verbs, plus `raw_json=1`.
    pub fn query_for(&self, request: &Request) -> Vec<(String, String)> {
        let mut query = request.params.clone();
        if !request.is_mutating() {
            query.extend(request.data.iter().cloned());
        }
        if !query.iter().any(|(k, _)| k == "raw_json") {
            query.push(("raw_json".to_string(), "1".to_string()));
        }
        query
    }

    fn build(&self, request: &Request, url: &str) -> HttpRequest {
        let mut http = HttpRequest::new(request.method.clone(), url);
        http.timeout = self.timeout;
        http.query = self.query_for(request);
        if request.is_mutating() {
            http.form = request.data.clone();
            if !http.form.iter().any(|(k, _)| k == "api_type") {
                http.form.push(("api_type".to_string(), "json".to_string()));
            }
        }
        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            http.headers.insert(USER_AGENT, agent);
        }
        http
    }

    /// Send `request` and return the parsed JSON body, `Value::Null` for an
    /// empty body.
    pub async fn execute(&self, request: &Request, cancel: &CancelToken) -> Result<Value> {
        let url = self.resolve(request)?;
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            self.limiter.pre_request(cancel).await?;
            let mut http = self.build(request, &url);
            let token = self.auth.authorize_request(&mut http, cancel).await?;

            debug!("{} {} (attempt {})", request.method, url, attempt + 1);
            let response = match cancel.run(self.transport.send(http)).await? {
                Ok(response) => response,
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    let delay = self.backoff(attempt);
                    warn!("{} {} failed: {}; retrying in {:.2?}", request.method, url, err, delay);
                    attempt += 1;
                    cancel.sleep(delay).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };
            self.limiter.post_response(&response.headers).await;

            match classify(&url, response) {
                Outcome::Done(value) => return Ok(value),
                Outcome::Unauthorized if !refreshed => {
                    debug!("{} answered 401, refreshing token", url);
                    self.auth.invalidate(&token);
                    refreshed = true;
                }
                Outcome::Unauthorized => {
                    return Err(RedditClientError::AuthError(
                        "request still unauthorized after token refresh".to_string(),
                    ))
                }
                Outcome::RateLimited(advised) => {
                    if attempt >= self.retries {
                        return Err(RedditClientError::RateLimitError {
                            retries: self.retries,
                        });
                    }
                    let delay = advised.unwrap_or_else(|| self.backoff(attempt));
                    warn!("Rate limited by {}, retrying in {:.2?}", url, delay);
                    attempt += 1;
                    cancel.sleep(delay).await?;
                }
                Outcome::ServerError(status) => {
                    if attempt >= self.retries {
                        return Err(RedditClientError::transport(format!(
                            "{} answered {} after {} retries",
                            url, status, self.retries
                        )));
                    }
                    let delay = self.backoff(attempt);
                    warn!("{} answered {}, retrying in {:.2?}", url, status, delay);
                    attempt += 1;
                    cancel.sleep(delay).await?;
                }
                Outcome::Fail(err) => return Err(err),
            }
        }
    }

    /// Full-jitter exponential backoff: uniform in `[0, min(cap, base * 2^attempt)]`.
    fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self
            .backoff_base
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.backoff_cap);
        let millis = ceiling.as_millis().min(u64::MAX as u128) as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }
}

fn classify(url: &str, response: HttpResponse) -> Outcome {
    let status = response.status;

    if status.is_success() {
        if response.body.trim().is_empty() {
            return Outcome::Done(Value::Null);
        }
        let json: Value = match serde_json::from_str(&response.body) {
            Ok(json) => json,
            Err(err) => {
                return Outcome::Fail(RedditClientError::ResponseError(format!(
                    "invalid JSON from {}: {}",
                    url, err
                )))
            }
        };
        let items = ApiError::items_from_body(&json);
        if !items.is_empty() {
            return Outcome::Fail(RedditClientError::ApiError(ApiError {
                items,
                status,
                body: response.body,
            }));
        }
        return Outcome::Done(json);
    }

    if status.is_redirection() {
        let location = response.header_value(LOCATION.as_str()).unwrap_or_default().to_string();
        return Outcome::Fail(RedditClientError::Redirect { status, location });
    }

    match status {
        StatusCode::UNAUTHORIZED => Outcome::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => Outcome::RateLimited(advised_delay(&response)),
        StatusCode::NOT_FOUND => Outcome::Fail(RedditClientError::NotFound { url: url.to_string() }),
        s if s.is_server_error() => Outcome::ServerError(s),
        _ => Outcome::Fail(RedditClientError::ApiError(client_error(status, response.body))),
    }
}

/// How long a 429 asks us to wait: `Retry-After`, else the rate-limit reset.
fn advised_delay(response: &HttpResponse) -> Option<Duration> {
    [RETRY_AFTER.as_str(), RESET_HEADER]
        .iter()
        .find_map(|name| response.header_value(name)?.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs_f64(secs.min(3600.0)))
}

/// Build the error for a 4xx other than 401, 404 and 429.
fn client_error(status: StatusCode, body: String) -> ApiError {
    let json = serde_json::from_str::<Value>(&body).unwrap_or(Value::Null);
    let mut items = ApiError::items_from_body(&json);
    if items.is_empty() {
        items.extend(ErrorItem::from_json(&json));
    }
    if items.is_empty() {
        items.push(ErrorItem {
            error_type: status.canonical_reason().unwrap_or("HTTP_ERROR").to_string(),
            message: body.trim().chars().take(200).collect(),
            field: None,
        });
    }
    ApiError { items, status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockResponse, MockTransport};
    use reqwest::header::HeaderMap;
    use reqwest::Method;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    fn pipeline(transport: MockTransport) -> RequestPipeline {
        let config = Config::new("test-agent")
            .with_script_credentials("id", "secret", "user", "pass")
            .with_base_url("https://oauth.example")
            .with_auth_url("https://www.example");
        let credentials = config.validate().unwrap();
        RequestPipeline::new(&config, credentials, "test-agent".into(), Arc::new(transport)).unwrap()
    }

    #[test]
    fn success_classification() {
        assert!(matches!(classify("u", response(200, "")), Outcome::Done(Value::Null)));
        assert!(matches!(classify("u", response(200, "  \n")), Outcome::Done(Value::Null)));
        assert!(matches!(
            classify("u", response(200, "<html>")),
            Outcome::Fail(RedditClientError::ResponseError(_))
        ));
        assert!(matches!(
            classify("u", response(200, r#"{"json": {"errors": []}}"#)),
            Outcome::Done(_)
        ));
    }

    #[test]
    fn errors_in_successful_body() {
        let body = r#"{"json": {"errors": [["BAD_CAPTCHA", "wrong captcha", "captcha"]]}}"#;
        match classify("u", response(200, body)) {
            Outcome::Fail(RedditClientError::ApiError(err)) => {
                assert_eq!(err.error_type(), "BAD_CAPTCHA");
                assert_eq!(err.field(), Some("captcha"));
            }
            _ => panic!("expected api error"),
        }
    }

    #[test]
    fn status_classification() {
        assert!(matches!(classify("u", response(401, "")), Outcome::Unauthorized));
        assert!(matches!(classify("u", response(429, "")), Outcome::RateLimited(None)));
        assert!(matches!(classify("u", response(503, "")), Outcome::ServerError(_)));
        assert!(matches!(
            classify("u", response(404, "")),
            Outcome::Fail(RedditClientError::NotFound { .. })
        ));
        assert!(matches!(
            classify("u", response(302, "")),
            Outcome::Fail(RedditClientError::Redirect { .. })
        ));
    }

    #[test]
    fn forbidden_carries_reason() {
        let body = r#"{"reason": "private", "message": "Forbidden", "error": 403}"#;
        match classify("u", response(403, body)) {
            Outcome::Fail(RedditClientError::ApiError(err)) => {
                assert_eq!(err.error_type(), "private");
                assert_eq!(err.message(), "Forbidden");
                assert_eq!(err.status, StatusCode::FORBIDDEN);
            }
            _ => panic!("expected api error"),
        }

        match classify("u", response(400, "bad")) {
            Outcome::Fail(RedditClientError::ApiError(err)) => {
                assert_eq!(err.error_type(), "Bad Request");
                assert_eq!(err.message(), "bad");
            }
            _ => panic!("expected api error"),
        }
    }

    #[test]
    fn retry_after_wins_over_reset() {
        let mut limited = response(429, "");
        limited.headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        limited.headers.insert(RESET_HEADER, HeaderValue::from_static("40"));
        assert_eq!(advised_delay(&limited), Some(Duration::from_secs(3)));

        let mut reset_only = response(429, "");
        reset_only.headers.insert(RESET_HEADER, HeaderValue::from_static("7"));
        assert_eq!(advised_delay(&reset_only), Some(Duration::from_secs(7)));
    }

    #[test]
    fn request_building() {
        let pipeline = pipeline(MockTransport::new());
        let post = Request::post("vote").form("id", "t3_a").form("dir", "1");
        let http = pipeline.build(&post, "https://oauth.example/api/vote");
        assert_eq!(http.form_value("api_type"), Some("json"));
        assert_eq!(http.query_value("raw_json"), Some("1"));
        assert_eq!(http.header_value("user-agent"), Some("test-agent"));

        let get = Request::get("hot").param("limit", "5").form("extra", "x");
        let http = pipeline.build(&get, "https://oauth.example/hot");
        assert!(http.form.is_empty());
        assert_eq!(http.query_value("extra"), Some("x"));
        assert_eq!(http.method, Method::GET);
    }

    #[test]
    fn backoff_stays_under_cap() {
        let pipeline = pipeline(MockTransport::new());
        for attempt in 0..40 {
            assert!(pipeline.backoff(attempt) <= Duration::from_secs(32));
        }
    }

    #[tokio::test]
    async fn resolves_named_and_raw_paths() {
        let pipeline = pipeline(MockTransport::new());
        assert_eq!(
            pipeline.resolve(&Request::get("subreddit_about").arg("rust")).unwrap(),
            "https://oauth.example/r/rust/about"
        );
        assert_eq!(
            pipeline.resolve(&Request::get_path("/user/a/m/b/hot")).unwrap(),
            "https://oauth.example/user/a/m/b/hot"
        );
        assert!(matches!(
            pipeline.resolve(&Request::get("nope")),
            Err(RedditClientError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn empty_body_returns_null() {
        let transport = MockTransport::new()
            .with_token("tok", 3600)
            .expect(Method::POST, "/api/save", MockResponse::empty(200));
        let pipeline = pipeline(transport);
        let value = pipeline
            .execute(&Request::post("save").form("id", "t3_a"), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }
}
