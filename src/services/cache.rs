//! In-process TTL cache shared by the marine and tide fetchers.
//!
//! Entries are replaced whole on refresh (last write wins) and never evicted;
//! an expired entry stays around so it can be served as stale when a refresh
//! fails. Concurrent misses for the same key may both call the fetch function.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source of "now" for freshness checks.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A stored value and when it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
}

/// A value returned by [`TtlCache::get_or_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    /// True when the value is past its TTL and a refresh just failed.
    pub stale: bool,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at < self.ttl
    }

    /// The value for `key` if it is still within the TTL.
    pub async fn get_fresh(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| self.is_fresh(e, now))
            .map(|e| e.value.clone())
    }

    /// The last stored entry for `key`, fresh or not.
    pub async fn get_any(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store `value` as fetched now, superseding any previous entry.
    pub async fn insert(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            fetched_at: self.clock.now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Return a fresh value, or fetch and store a new one.
    ///
    /// If the fetch fails and an expired entry exists, that entry is returned
    /// with `stale = true`; with no entry at all the fetch error is returned.
    /// The lock is not held while `fetch` runs.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<Cached<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: std::fmt::Display,
    {
        if let Some(value) = self.get_fresh(&key).await {
            tracing::debug!("cache hit for {:?}", key);
            return Ok(Cached {
                value,
                stale: false,
            });
        }

        tracing::debug!("cache miss for {:?}", key);
        match fetch().await {
            Ok(value) => {
                self.insert(key, value.clone()).await;
                Ok(Cached {
                    value,
                    stale: false,
                })
            }
            Err(e) => match self.get_any(&key).await {
                Some(entry) => {
                    tracing::warn!(
                        "refresh for {:?} failed, serving entry fetched at {}: {}",
                        key,
                        entry.fetched_at.to_rfc3339(),
                        e
                    );
                    Ok(Cached {
                        value: entry.value,
                        stale: true,
                    })
                }
                None => Err(e),
            },
        }
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
