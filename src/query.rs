use std::collections::HashMap;

use tracing::debug;

pub const SECRETS_QUERY_KEY: &str = "secrets";

#[derive(Debug, Clone)]
pub struct QueryEntry<T> {
    pub data: Option<T>,
    pub fetching: bool,
    pub stale: bool,
    pub failed: bool,
    /// Bumped by every invalidation.
    generation: u64,
    /// Generation the running fetch was started at.
    fetch_generation: u64,
}

impl<T> Default for QueryEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetching: false,
            stale: false,
            failed: false,
            generation: 0,
            fetch_generation: 0,
        }
    }
}

/// Client-side copy of server data, keyed by query key.
#[derive(Debug, Clone)]
pub struct QueryCache<T> {
    entries: HashMap<&'static str, QueryEntry<T>>,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> QueryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|e| e.data.as_ref())
    }

    pub fn entry(&self, key: &str) -> Option<&QueryEntry<T>> {
        self.entries.get(key)
    }

    /// No data yet and a fetch is running.
    pub fn is_loading(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.data.is_none() && e.fetching)
    }

    pub fn is_fetching(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.fetching)
    }

    /// Marks the entry as fetching and returns true if the caller should
    /// dispatch a request for it.
    pub fn begin_fetch(&mut self, key: &'static str) -> bool {
        let entry = self.entries.entry(key).or_default();
        if entry.fetching || (!entry.stale && (entry.data.is_some() || entry.failed)) {
            return false;
        }
        entry.fetching = true;
        entry.fetch_generation = entry.generation;
        true
    }

    /// Stores a fetch result. The entry stays stale if it was invalidated
    /// after that fetch started, so the newer invalidation still refetches.
    pub fn set_data(&mut self, key: &'static str, data: T) {
        let entry = self.entries.entry(key).or_default();
        entry.data = Some(data);
        entry.stale = entry.fetching && entry.generation != entry.fetch_generation;
        entry.fetching = false;
        entry.failed = false;
    }

    /// A failed fetch keeps whatever data was there and is not retried until
    /// the key is invalidated again.
    pub fn fetch_failed(&mut self, key: &'static str) {
        let entry = self.entries.entry(key).or_default();
        entry.stale = entry.fetching && entry.generation != entry.fetch_generation;
        entry.fetching = false;
        entry.failed = true;
    }

    pub fn invalidate(&mut self, key: &'static str) {
        debug!("Invalidating query '{}'", key);
        let entry = self.entries.entry(key).or_default();
        entry.generation += 1;
        entry.stale = true;
    }

    /// Rewrites the cached data in place. `f` sees `None` when nothing is cached.
    pub fn set_query_data<F>(&mut self, key: &'static str, f: F)
    where
        F: FnOnce(Option<T>) -> T,
    {
        let entry = self.entries.entry(key).or_default();
        let old = entry.data.take();
        entry.data = Some(f(old));
    }
}

/// An optimistic removal that has been applied locally and is waiting for the
/// remote action to settle.
#[derive(Debug)]
#[must_use = "an optimistic removal must be settled once the remote action completes"]
pub struct OptimisticRemoval {
    key: &'static str,
}

impl OptimisticRemoval {
    /// Removes every cached item matching `remove` before any request is sent.
    pub fn begin<T, P>(cache: &mut QueryCache<Vec<T>>, key: &'static str, mut remove: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        cache.set_query_data(key, |old| {
            old.map(|items| items.into_iter().filter(|item| !remove(item)).collect())
                .unwrap_or_default()
        });
        Self { key }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// On failure the entry is invalidated so the next fetch restores server
    /// truth. Returns true if the cache was invalidated.
    pub fn settle<T, E>(self, cache: &mut QueryCache<T>, outcome: &Result<(), E>) -> bool {
        match outcome {
            Ok(()) => false,
            Err(_) => {
                cache.invalidate(self.key);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> QueryCache<Vec<&'static str>> {
        let mut cache = QueryCache::new();
        cache.set_data(SECRETS_QUERY_KEY, vec!["A", "B"]);
        cache
    }

    #[test]
    fn test_loading_only_without_data() {
        let mut cache: QueryCache<Vec<&str>> = QueryCache::new();
        assert!(!cache.is_loading(SECRETS_QUERY_KEY));
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
        assert!(cache.is_loading(SECRETS_QUERY_KEY));
        // already in flight
        assert!(!cache.begin_fetch(SECRETS_QUERY_KEY));

        cache.set_data(SECRETS_QUERY_KEY, vec![]);
        assert!(!cache.is_loading(SECRETS_QUERY_KEY));
        assert!(!cache.begin_fetch(SECRETS_QUERY_KEY));

        // background refetch is not "loading"
        cache.invalidate(SECRETS_QUERY_KEY);
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
        assert!(!cache.is_loading(SECRETS_QUERY_KEY));
        assert!(cache.is_fetching(SECRETS_QUERY_KEY));
    }

    #[test]
    fn test_failed_fetch_does_not_retry_forever() {
        let mut cache: QueryCache<Vec<&str>> = QueryCache::new();
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
        cache.fetch_failed(SECRETS_QUERY_KEY);
        assert!(!cache.is_loading(SECRETS_QUERY_KEY));
        assert!(!cache.begin_fetch(SECRETS_QUERY_KEY));

        cache.invalidate(SECRETS_QUERY_KEY);
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
    }

    #[test]
    fn test_invalidation_during_fetch_triggers_refetch() {
        let mut cache: QueryCache<Vec<&str>> = QueryCache::new();
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
        cache.invalidate(SECRETS_QUERY_KEY);
        // older response lands after the invalidation
        cache.set_data(SECRETS_QUERY_KEY, vec!["A"]);
        assert_eq!(cache.data(SECRETS_QUERY_KEY), Some(&vec!["A"]));
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));

        cache.set_data(SECRETS_QUERY_KEY, vec!["B"]);
        assert!(!cache.begin_fetch(SECRETS_QUERY_KEY));

        // same for a failed fetch
        cache.invalidate(SECRETS_QUERY_KEY);
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
        cache.invalidate(SECRETS_QUERY_KEY);
        cache.fetch_failed(SECRETS_QUERY_KEY);
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
    }

    #[test]
    fn test_optimistic_removal_applies_immediately() {
        let mut cache = seeded();
        let removal = OptimisticRemoval::begin(&mut cache, SECRETS_QUERY_KEY, |s| *s == "A");
        assert_eq!(cache.data(SECRETS_QUERY_KEY), Some(&vec!["B"]));
        assert_eq!(removal.key(), SECRETS_QUERY_KEY);
        assert!(!removal.settle(&mut cache, &Ok::<(), String>(())));
        assert_eq!(cache.data(SECRETS_QUERY_KEY), Some(&vec!["B"]));
        assert!(!cache.entry(SECRETS_QUERY_KEY).map(|e| e.stale).unwrap_or(true));
    }

    #[test]
    fn test_failed_removal_invalidates() {
        let mut cache = seeded();
        let removal = OptimisticRemoval::begin(&mut cache, SECRETS_QUERY_KEY, |s| *s == "A");
        assert!(removal.settle(&mut cache, &Err::<(), _>("boom")));
        assert!(cache.entry(SECRETS_QUERY_KEY).map(|e| e.stale).unwrap_or(false));
        assert!(cache.begin_fetch(SECRETS_QUERY_KEY));
    }

    #[test]
    fn test_removal_on_empty_cache_yields_empty_list() {
        let mut cache: QueryCache<Vec<&str>> = QueryCache::new();
        let _ = OptimisticRemoval::begin(&mut cache, SECRETS_QUERY_KEY, |s| *s == "A");
        assert_eq!(cache.data(SECRETS_QUERY_KEY), Some(&Vec::new()));
    }
}
