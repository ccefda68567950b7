use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Response cache keyed by request URL. Gridded forecasts only change a few
/// times a day, so refreshes within the TTL reuse the last decoded value.
pub struct TtlCache<V: Clone> {
    cache: DashMap<String, Cached<V>>,
    ttl: Duration,
}

struct Cached<V> {
    value: V,
    timestamp: Instant,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
        }
    }

    pub fn insert(&self, key: String, value: V) {
        self.cache.insert(key, Cached {
            value,
            timestamp: Instant::now(),
        });
    }

    /// Get value if not expired (evict on read)
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.cache.get(key)?;
        if entry.timestamp.elapsed() > self.ttl {
            drop(entry); // Drop the read lock
            self.cache.remove(key);
            None
        } else {
            Some(entry.value.clone())
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
