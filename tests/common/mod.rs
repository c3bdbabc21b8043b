#![allow(dead_code)]

use redcore::{Config, MockTransport, RedditClient};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub fn config() -> Config {
    Config::new("redcore-tests/0.1")
        .with_script_credentials("client-id", "client-secret", "user", "pass")
        .with_base_url("https://oauth.example")
        .with_auth_url("https://www.example")
        .with_backoff(Duration::from_millis(1), Duration::from_millis(5))
}

/// A client over `transport`, which is handed back for inspection.
pub fn client_with(config: Config, transport: MockTransport) -> (RedditClient, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let client = RedditClient::with_transport(config, transport.clone()).expect("valid config");
    (client, transport)
}

pub fn client(transport: MockTransport) -> (RedditClient, Arc<MockTransport>) {
    client_with(config(), transport.with_token("token-1", 3600))
}

pub fn submission(id: &str) -> Value {
    json!({"kind": "t3", "data": {"id": id, "name": format!("t3_{}", id), "title": format!("post {}", id)}})
}

pub fn listing(children: Vec<Value>, after: Option<&str>) -> Value {
    json!({"kind": "Listing", "data": {"children": children, "after": after, "before": null}})
}

pub fn submissions(ids: impl IntoIterator<Item = usize>) -> Vec<Value> {
    ids.into_iter().map(|i| submission(&format!("p{}", i))).collect()
}
