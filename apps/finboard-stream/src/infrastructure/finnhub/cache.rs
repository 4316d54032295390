//! Time-bounded response cache for the quote service.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Default time a cached response stays fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// String-keyed cache whose entries expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh value for `key`, if any. Expired entries are evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some((stored_at, value)) if stored_at.elapsed() < self.ttl => {
                    return Some(value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.entries.write().remove(key);
        None
    }

    /// Store `value` under `key`, replacing any previous entry. Expired
    /// entries are dropped first.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let ttl = self.ttl;
        let mut entries = self.entries.write();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(key.into(), (Instant::now(), value));
    }

    /// Number of stored entries, fresh or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_returned() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("quote-AAPL", 178);
        assert_eq!(cache.get("quote-AAPL"), Some(178));
        assert_eq!(cache.get("quote-MSFT"), None);
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("quote-AAPL", 178);
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get("quote-AAPL"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_drops_expired_entries() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.insert("candles-AAPL-D-0-86400", 1);
        std::thread::sleep(Duration::from_millis(80));
        cache.insert("new", 2);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new"), Some(2));
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("k", 1);
        assert_eq!(cache.get("k"), None);
    }
}
