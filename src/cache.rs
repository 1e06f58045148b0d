//! In-memory TTL cache for assembled bookmark responses.
//!
//! Entries expire lazily on [`ResponseCache::get`] and eagerly via the
//! background sweeper started with [`ResponseCache::spawn_sweeper`]. The map is
//! read-mostly, so it sits behind a `tokio::sync::RwLock`: lookups share the
//! lock and only inserts and removals take it exclusively.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::types::{BookmarksResponse, FeedQuery};

/// Default time-to-live of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default interval between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: BookmarksResponse,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Shared response cache. Clone the surrounding `Arc` to share it.
#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached response for `key` if it has not expired.
    pub async fn get(&self, key: &str) -> Option<BookmarksResponse> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Stores `value` under `key`, replacing any previous entry and restarting
    /// its TTL.
    pub async fn set(&self, key: String, value: BookmarksResponse) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Removes `key`, returning whether an entry (expired or not) was present.
    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every expired entry and returns how many were removed.
    ///
    /// Expired keys are collected under the read lock so concurrent lookups
    /// proceed; the write lock is held only for the removals.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect()
        };

        if expired.is_empty() {
            return 0;
        }

        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in expired {
            // Re-check: the key may have been refreshed since the read pass
            if entries.get(&key).is_some_and(|entry| entry.is_expired(now)) {
                entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    /// Starts a task that purges expired entries every `interval`.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped. Abort the returned handle to stop it earlier.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    tracing::debug!("Response cache dropped, stopping sweeper");
                    break;
                };
                let removed = cache.purge_expired().await;
                if removed > 0 {
                    tracing::debug!(removed = removed, "Purged expired cache entries");
                }
            }
        })
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Cache key covering every field of `query`.
///
/// Each field is length-prefixed so that no two distinct queries share a key,
/// whatever characters the fields contain. Absent filters are encoded
/// differently from empty ones.
pub fn cache_key(query: &FeedQuery) -> String {
    fn push_field(key: &mut String, value: Option<&str>) {
        match value {
            Some(value) => {
                key.push_str(&value.len().to_string());
                key.push(':');
                key.push_str(value);
            }
            None => key.push('-'),
        }
        key.push('|');
    }

    let mut key = String::new();
    push_field(&mut key, Some(&query.username));
    push_field(&mut key, query.tag.as_deref());
    push_field(&mut key, query.date.as_deref());
    push_field(&mut key, query.url.as_deref());
    key.push_str(&query.page.to_string());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn response(user: &str) -> BookmarksResponse {
        BookmarksResponse {
            user: user.to_owned(),
            page: 1,
            total_count: 0,
            filters: None,
            bookmarks: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_before_and_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.set("k".into(), response("a")).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("k").await, Some(response("a")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").await, None);
        // Lazy expiry does not remove
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_restarts_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.set("k".into(), response("a")).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("k".into(), response("b")).await;
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get("k").await, Some(response("b")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_removes_only_expired() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.set("old".into(), response("a")).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.set("new".into(), response("b")).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("new").await.is_some());
        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cache = ResponseCache::default();
        cache.set("a".into(), response("a")).await;
        cache.set("b".into(), response("b")).await;

        assert!(cache.remove("a").await);
        assert!(!cache.remove("a").await);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(30)));
        let sweeper = cache.spawn_sweeper(Duration::from_secs(60));
        cache.set("k".into(), response("a")).await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        // Let the sweeper run its tick
        tokio::task::yield_now().await;

        assert_eq!(cache.len().await, 0);
        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_when_cache_dropped() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(30)));
        let sweeper = cache.spawn_sweeper(Duration::from_secs(1));
        drop(cache);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let finished = tokio::time::timeout(Duration::from_secs(5), sweeper).await;
        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(ResponseCache::default());
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = format!("k{}", i % 4);
                cache.set(key.clone(), response(&key)).await;
                cache.get(&key).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(cache.len().await, 4);
    }

    #[test]
    fn test_cache_key_distinguishes_every_field() {
        let queries = [
            FeedQuery::for_user("sample"),
            FeedQuery::for_user("sample").with_page(2),
            FeedQuery::for_user("sample").with_page(10),
            FeedQuery::for_user("sample").with_tag("go"),
            FeedQuery::for_user("sample").with_date("20240115"),
            FeedQuery::for_user("sample").with_url("https://e.com/"),
            FeedQuery::for_user("sample").with_tag("a|b"),
            FeedQuery::for_user("sample|a").with_tag("b"),
            FeedQuery::for_user("other"),
        ];
        let keys: HashSet<_> = queries.iter().map(cache_key).collect();
        assert_eq!(keys.len(), queries.len());
    }

    #[test]
    fn test_cache_key_is_stable() {
        let a = FeedQuery::for_user("sample").with_tag("go").with_page(3);
        let b = FeedQuery::for_user("sample").with_tag("go").with_page(3);
        assert_eq!(cache_key(&a), cache_key(&b));
        assert_eq!(cache_key(&a), "6:sample|2:go|-|-|3");
    }
}
