use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::cache::PatternCache;
use crate::pattern::GlobPattern;

/// In-memory LRU cache for compiled patterns.
///
/// Compilation is pure, so entries never go stale; the capacity only bounds
/// memory when grant databases contain many distinct globs.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<CacheState>>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Arc<GlobPattern>>,
    order: VecDeque<String>,
}

impl MemoryCache {
    /// Creates a new cache with the given capacity.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState::default())),
            capacity,
        }
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("poisoned lock").entries.len()
    }

    /// Returns true when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn touch(state: &mut CacheState, key: &str) {
        state.order.retain(|existing| existing != key);
        state.order.push_back(key.to_string());
    }

    fn evict_if_needed(state: &mut CacheState, capacity: usize) {
        while state.entries.len() > capacity {
            if let Some(key) = state.order.pop_front() {
                state.entries.remove(&key);
            } else {
                break;
            }
        }
    }
}

impl PatternCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Arc<GlobPattern>> {
        if self.capacity == 0 {
            return None;
        }

        let mut guard = self.inner.lock().expect("poisoned lock");
        let hit = guard.entries.get(key).cloned();
        if hit.is_some() {
            Self::touch(&mut guard, key);
        }
        hit
    }

    fn insert(&self, key: String, pattern: Arc<GlobPattern>) {
        if self.capacity == 0 {
            return;
        }

        let mut guard = self.inner.lock().expect("poisoned lock");
        Self::touch(&mut guard, &key);
        guard.entries.insert(key, pattern);
        Self::evict_if_needed(&mut guard, self.capacity);
    }

    fn clear(&self) {
        let mut guard = self.inner.lock().expect("poisoned lock");
        guard.entries.clear();
        guard.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSyntax;

    fn compiled(pattern: &str) -> Arc<GlobPattern> {
        Arc::new(GlobPattern::compile(pattern, PatternSyntax::Strict).unwrap())
    }

    #[test]
    fn lru_should_evict_least_recently_used() {
        let cache = MemoryCache::new(2);

        cache.insert("a".to_string(), compiled("a*"));
        cache.insert("b".to_string(), compiled("b*"));
        let _ = cache.get("a");
        cache.insert("c".to_string(), compiled("c*"));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_should_disable_caching() {
        let cache = MemoryCache::new(0);
        cache.insert("a".to_string(), compiled("a*"));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_should_drop_entries() {
        let cache = MemoryCache::new(4);
        cache.insert("a".to_string(), compiled("a*"));
        cache.insert("b".to_string(), compiled("b*"));
        cache.clear();

        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_and_fresh_matchers_should_agree() {
        let cache = MemoryCache::new(4);
        let fresh = compiled("inst-*");
        cache.insert("strict:inst-*".to_string(), fresh.clone());
        let cached = cache.get("strict:inst-*").unwrap();

        for value in ["inst-a", "inst", "INST-xyz", "other-a"] {
            assert_eq!(cached.matches(value), fresh.matches(value));
        }
    }
}
