//! Descriptor of one logical API call, before URL resolution and auth.

use reqwest::Method;

/// Where a request goes: a named registry entry or a raw API path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Named(String),
    Path(String),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub endpoint: Endpoint,
    pub path_args: Vec<String>,
    /// Query string parameters.
    pub params: Vec<(String, String)>,
    /// Form body for mutating verbs; folded into the query for GET.
    pub data: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            path_args: Vec::new(),
            params: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn get(name: &str) -> Self {
        Self::new(Method::GET, Endpoint::Named(name.to_string()))
    }

    pub fn post(name: &str) -> Self {
        Self::new(Method::POST, Endpoint::Named(name.to_string()))
    }

    pub fn put(name: &str) -> Self {
        Self::new(Method::PUT, Endpoint::Named(name.to_string()))
    }

    pub fn patch(name: &str) -> Self {
        Self::new(Method::PATCH, Endpoint::Named(name.to_string()))
    }

    pub fn delete(name: &str) -> Self {
        Self::new(Method::DELETE, Endpoint::Named(name.to_string()))
    }

    pub fn get_path(path: impl Into<String>) -> Self {
        Self::new(Method::GET, Endpoint::Path(path.into()))
    }

    pub fn post_path(path: impl Into<String>) -> Self {
        Self::new(Method::POST, Endpoint::Path(path.into()))
    }

    /// Append a positional path argument.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.path_args.push(value.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn form(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.data.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.data.push((key.to_string(), value)),
        }
        self
    }

    /// Set a query parameter, replacing any earlier value for `key`.
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
    }

    pub fn remove_param(&mut self, key: &str) {
        self.params.retain(|(k, _)| k != key);
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}
