//! The HTTP seam.
//!
//! The request pipeline only ever talks to an [`HttpTransport`]. Production
//! code uses [`ReqwestTransport`]; tests script responses with
//! [`MockTransport`](mock::MockTransport).

pub mod mock;

use crate::error::{RedditClientError, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Method, StatusCode};
use std::time::Duration;

/// A fully resolved outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Sent as `application/x-www-form-urlencoded` when non-empty.
    pub form: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            headers: HeaderMap::new(),
            timeout: Duration::from_secs(16),
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        lookup(&self.query, key)
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        lookup(&self.form, key)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A response with its body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one HTTP exchange. Connection, DNS, TLS and timeout failures
    /// are reported as [`RedditClientError::TransportError`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: Self::get_client(user_agent)?,
        })
    }

    fn get_client(user_agent: &str) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| RedditClientError::ConfigError(format!("cannot build HTTP client: {}", e)))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut req_builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .timeout(request.timeout);
        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }
        if !request.form.is_empty() {
            req_builder = req_builder.form(&request.form);
        }

        let response = req_builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        debug!("Response status: {}", status);

        let body = response.text().await?;
        debug!("Response body length: {} bytes", body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
