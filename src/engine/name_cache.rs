use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;

pub const DEFAULT_CAPACITY: usize = 64;

/// Bounded cache of model-suggested name lists, keyed by theme, prompt and
/// requested count.
/// Least recently used entries are evicted once `capacity` is reached.
pub struct NameCache {
    entries: LruCache<(String, String, usize), Vec<String>>,
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NameCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Cached list for `(theme, prompt, count)`, or the result of `fetch`.
    /// Empty results are not cached so a failed request can be retried.
    pub fn get_or_fetch<F>(&mut self, theme: &str, prompt: &str, count: usize, fetch: F) -> Vec<String>
    where
        F: FnOnce() -> Vec<String>,
    {
        let key = (theme.to_string(), prompt.to_string(), count);
        if let Some(names) = self.entries.get(&key) {
            debug!("name cache hit for theme '{theme}'");
            return names.clone();
        }

        let names = fetch();
        if !names.is_empty() {
            self.entries.put(key, names.clone());
        }
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
