use crate::pattern::{GlobPattern, PatternSyntax};
use crate::types::fold;
use std::sync::Arc;

/// Cache interface for compiled glob patterns.
///
/// Keys already encode the pattern syntax, so one cache may be shared by
/// engines configured differently.
pub trait PatternCache: Send + Sync {
    /// Gets a compiled pattern.
    fn get(&self, key: &str) -> Option<Arc<GlobPattern>>;

    /// Stores a compiled pattern.
    fn insert(&self, key: String, pattern: Arc<GlobPattern>);

    /// Drops every entry.
    fn clear(&self);
}

/// No-op cache implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl PatternCache for NoCache {
    fn get(&self, _key: &str) -> Option<Arc<GlobPattern>> {
        None
    }

    fn insert(&self, _key: String, _pattern: Arc<GlobPattern>) {}

    fn clear(&self) {}
}

pub(crate) fn cache_key(pattern: &str, syntax: PatternSyntax) -> String {
    format!("{}:{}", syntax.tag(), fold(pattern))
}

/// Compiles patterns through a cache for one evaluation.
pub(crate) struct Matcher<'a> {
    cache: &'a dyn PatternCache,
    syntax: PatternSyntax,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(cache: &'a dyn PatternCache, syntax: PatternSyntax) -> Self {
        Self { cache, syntax }
    }

    fn compiled(&self, pattern: &str) -> Option<Arc<GlobPattern>> {
        let key = cache_key(pattern, self.syntax);
        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }
        match GlobPattern::compile(pattern, self.syntax) {
            Ok(compiled) => {
                let compiled = Arc::new(compiled);
                self.cache.insert(key, compiled.clone());
                Some(compiled)
            }
            Err(err) => {
                tracing::warn!(pattern, error = %err, "ignoring uncompilable pattern");
                None
            }
        }
    }

    /// Returns true if any glob matches the value. Uncompilable globs match
    /// nothing.
    pub(crate) fn any_matches(&self, patterns: &[String], value: &str) -> bool {
        patterns.iter().any(|pattern| {
            self.compiled(pattern)
                .is_some_and(|compiled| compiled.matches(value))
        })
    }
}
