//! Error types for the Reddit client.
//!
//! Every failure surfaced by the library is a [`RedditClientError`], so callers
//! can match on the kind they care about or bubble everything up with `?`.

use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedditClientError>;

/// One `[code, message, field]` entry from Reddit's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorItem {
    pub error_type: String,
    pub message: String,
    pub field: Option<String>,
}

impl ErrorItem {
    /// Parse a single entry. Reddit mostly sends arrays, but a few newer
    /// endpoints send objects with `error`/`reason` and `message` keys.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(parts) => {
                let text = |i: usize| parts.get(i).and_then(Value::as_str).map(str::to_string);
                Some(Self {
                    error_type: text(0)?,
                    message: text(1).unwrap_or_default(),
                    field: text(2).filter(|f| !f.is_empty()),
                })
            }
            Value::Object(map) => {
                let error_type = ["error_type", "reason", "error"]
                    .iter()
                    .find_map(|key| match map.get(*key) {
                        Some(Value::String(s)) => Some(s.clone()),
                        Some(Value::Number(n)) => Some(n.to_string()),
                        _ => None,
                    })?;
                let message = ["message", "explanation"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .unwrap_or_default()
                    .to_string();
                let field = ["field", "fields"].iter().find_map(|key| match map.get(*key) {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(str::to_string),
                    _ => None,
                });
                Some(Self {
                    error_type,
                    message,
                    field,
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for ErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: '{}'", self.error_type, self.message)?;
        if let Some(field) = &self.field {
            write!(f, " on field '{}'", field)?;
        }
        Ok(())
    }
}

/// A business-level error reported by Reddit.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub items: Vec<ErrorItem>,
    pub status: StatusCode,
    pub body: String,
}

impl ApiError {
    /// Collect the entries of an `errors` array, looking both at the top level
    /// and under the `json` envelope used by `api_type=json` replies.
    pub fn items_from_body(body: &Value) -> Vec<ErrorItem> {
        let errors = body
            .get("json")
            .and_then(|json| json.get("errors"))
            .or_else(|| body.get("errors"));

        match errors {
            Some(Value::Array(items)) => items.iter().filter_map(ErrorItem::from_json).collect(),
            _ => Vec::new(),
        }
    }

    pub fn error_type(&self) -> &str {
        self.items.first().map(|i| i.error_type.as_str()).unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.items.first().map(|i| i.message.as_str()).unwrap_or_default()
    }

    pub fn field(&self) -> Option<&str> {
        self.items.first().and_then(|i| i.field.as_deref())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.items.as_slice() {
            [] => write!(f, "HTTP {}", self.status),
            [only] => write!(f, "{}", only),
            [first, rest @ ..] => write!(f, "{} (and {} more)", first, rest.len()),
        }
    }
}

// Define a custom error type for handling Reddit API errors
#[derive(Error, Debug)]
pub enum RedditClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limited: gave up after {retries} retries")]
    RateLimitError { retries: u32 },

    #[error("Transport error: {message}")]
    TransportError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unexpected response: {0}")]
    ResponseError(String),

    #[error("Reddit API error: {0}")]
    ApiError(ApiError),

    #[error("Client error: {0}")]
    ClientError(String),

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Redirected ({status}) to {location}")]
    Redirect { status: StatusCode, location: String },

    #[error("{kind} has no attribute '{attribute}'")]
    MissingAttribute { kind: String, attribute: String },

    #[error("Request cancelled")]
    Cancelled,
}

impl RedditClientError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        RedditClientError::TransportError {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the pipeline retries this failure with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RedditClientError::TransportError { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RedditClientError::Cancelled)
    }

    /// The API error payload, when Reddit reported one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            RedditClientError::ApiError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RedditClientError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        RedditClientError::TransportError {
            message,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for RedditClientError {
    fn from(err: serde_json::Error) -> Self {
        RedditClientError::ResponseError(format!("invalid JSON: {}", err))
    }
}

impl From<url::ParseError> for RedditClientError {
    fn from(err: url::ParseError) -> Self {
        RedditClientError::ConfigError(format!("invalid URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_array_error_items() {
        let body = json!({"json": {"errors": [["BAD_CAPTCHA", "wrong captcha", "captcha"]]}});
        let items = ApiError::items_from_body(&body);
        assert_eq!(
            items,
            vec![ErrorItem {
                error_type: "BAD_CAPTCHA".into(),
                message: "wrong captcha".into(),
                field: Some("captcha".into()),
            }]
        );
    }

    #[test]
    fn parses_object_error_items_and_empty_fields() {
        let body = json!({"errors": [
            {"reason": "SUBREDDIT_NOEXIST", "explanation": "that subreddit doesn't exist", "fields": ["sr"]},
            ["RATELIMIT", "slow down", ""],
        ]});
        let items = ApiError::items_from_body(&body);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].error_type, "SUBREDDIT_NOEXIST");
        assert_eq!(items[0].field.as_deref(), Some("sr"));
        assert_eq!(items[1].field, None);
    }

    #[test]
    fn api_error_display_mentions_extra_items() {
        let err = ApiError {
            items: vec![
                ErrorItem {
                    error_type: "A".into(),
                    message: "first".into(),
                    field: None,
                },
                ErrorItem {
                    error_type: "B".into(),
                    message: "second".into(),
                    field: None,
                },
            ],
            status: StatusCode::OK,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "A: 'first' (and 1 more)");
        assert_eq!(err.error_type(), "A");
    }
}
