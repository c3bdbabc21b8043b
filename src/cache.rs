//! Bounded in-memory cache for GET responses.
//!
//! Disabled unless [`Config::cache`](crate::Config) is set. Entries are keyed
//! by resolved URL plus query string and expire after a fixed TTL.

use crate::config::CacheSettings;
use crate::endpoints::template_matches;
use log::debug;
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    data: Value,
    cached_at: Instant,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(settings: CacheSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: settings.ttl,
        }
    }

    /// Build the cache key for a GET request.
    pub fn key(url: &str, query: &[(String, String)]) -> String {
        let mut pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.sort();
        format!("{}?{}", url, pairs.join("&"))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(key) {
            Some(entry) if entry.cached_at.elapsed() <= self.ttl => {
                debug!("Cache hit for {}", key);
                return Some(entry.data.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: String, data: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(
            key,
            CacheEntry {
                data,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose URL is an instance of one of `templates`.
    pub fn invalidate(&self, templates: &[String]) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let stale: Vec<String> = entries
            .iter()
            .filter(|(key, _)| {
                let url = key.split_once('?').map_or(key.as_str(), |(url, _)| url);
                templates.iter().any(|t| template_matches(t, url))
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(capacity: usize, ttl: Duration) -> ResponseCache {
        ResponseCache::new(CacheSettings { capacity, ttl })
    }

    #[test]
    fn key_ignores_query_order() {
        let a = ResponseCache::key("u", &[("b".into(), "2".into()), ("a".into(), "1".into())]);
        let b = ResponseCache::key("u", &[("a".into(), "1".into()), ("b".into(), "2".into())]);
        assert_eq!(a, b);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = cache(2, Duration::from_secs(60));
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        assert_eq!(cache.get("a"), Some(json!(1)));
        cache.insert("c".into(), json!(3));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = cache(4, Duration::ZERO);
        cache.insert("a".into(), json!(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_by_template() {
        let cache = cache(8, Duration::from_secs(60));
        cache.insert("https://x/r/rust/about?raw_json=1".into(), json!(1));
        cache.insert("https://x/r/golang/about?raw_json=1".into(), json!(2));
        cache.insert("https://x/r/rust/hot?raw_json=1".into(), json!(3));
        cache.insert("https://x/user/me?raw_json=1".into(), json!(4));
        cache.invalidate(&["https://x/r/{subreddit}/about".to_string()]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("https://x/r/rust/hot?raw_json=1"), Some(json!(3)));
    }
}
