//! Scripted transport for tests.
//!
//! Routes are matched by HTTP method and a fragment of the URL path. Each
//! route serves its queued responses in order; a sticky route keeps serving
//! its last response. Every request is recorded for later inspection.

use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{RedditClientError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A canned reply.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    delay: Duration,
    fail: bool,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, body.to_string())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: HeaderMap::new(),
            body: body.into(),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::text(status, "")
    }

    /// Fail at the transport level instead of answering.
    pub fn transport_error() -> Self {
        Self {
            fail: true,
            ..Self::empty(500)
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Standard Reddit rate-limit headers.
    pub fn with_rate_limit(self, remaining: f64, reset_seconds: u64, used: u64) -> Self {
        self.with_header("x-ratelimit-remaining", &remaining.to_string())
            .with_header("x-ratelimit-reset", &reset_seconds.to_string())
            .with_header("x-ratelimit-used", &used.to_string())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct Route {
    method: Method,
    path: String,
    responses: VecDeque<MockResponse>,
    sticky: bool,
}

/// An [`HttpTransport`] that replays scripted responses.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for `method` requests whose URL contains `path`.
    pub fn expect(self, method: Method, path: &str, response: MockResponse) -> Self {
        self.push_route(method, path, response, false);
        self
    }

    /// Serve `response` for every matching request once earlier queued
    /// responses for the route are used up.
    pub fn always(self, method: Method, path: &str, response: MockResponse) -> Self {
        self.push_route(method, path, response, true);
        self
    }

    /// Answer the token endpoint with a fresh bearer token, repeatedly.
    pub fn with_token(self, access_token: &str, expires_in: u64) -> Self {
        self.always(
            Method::POST,
            "/api/v1/access_token",
            MockResponse::json(
                200,
                serde_json::json!({
                    "access_token": access_token,
                    "token_type": "bearer",
                    "expires_in": expires_in,
                    "scope": "*",
                }),
            ),
        )
    }

    fn push_route(&self, method: Method, path: &str, response: MockResponse, sticky: bool) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path && r.sticky == sticky)
        {
            route.responses.push_back(response);
            return;
        }
        routes.push(Route {
            method,
            path: path.to_string(),
            responses: VecDeque::from([response]),
            sticky,
        });
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of received requests whose URL contains `path`.
    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.url.contains(path))
            .count()
    }

    fn next_response(&self, request: &HttpRequest) -> Option<MockResponse> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let path = url_path(&request.url);
        // one-shot routes win over sticky ones
        let mut candidates = routes
            .iter_mut()
            .filter(|r| r.method == request.method && path.contains(&r.path))
            .filter(|r| !r.responses.is_empty())
            .collect::<Vec<_>>();
        candidates.sort_by_key(|r| r.sticky);
        let route = candidates.into_iter().next()?;
        if route.sticky && route.responses.len() == 1 {
            route.responses.front().cloned()
        } else {
            route.responses.pop_front()
        }
    }
}

fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match without_scheme.find('/') {
        Some(i) => &without_scheme[i..],
        None => "/",
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let response = self.next_response(&request).ok_or_else(|| {
            RedditClientError::ClientError(format!(
                "no mock response for {} {}",
                request.method, request.url
            ))
        })?;

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        if response.fail {
            return Err(RedditClientError::transport("mock connection reset"));
        }

        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }
}
