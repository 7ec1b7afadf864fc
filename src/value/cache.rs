//! Literal-parse cache
//!
//! Path data and point lists are the expensive, property-independent
//! shapes; documents repeat them (shared geometry resources, styles), so
//! a small per-thread LRU in front of the parser pays for itself. Misses
//! are cached too, so a repeated bad literal is rejected once.

use super::{Value, ValueKind};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;

const CACHE_CAPACITY: usize = 64;

thread_local! {
    static LITERAL_CACHE: RefCell<LruCache<(ValueKind, String), Option<Value>>> =
        RefCell::new(LruCache::new(
            NonZeroUsize::new(CACHE_CAPACITY).unwrap(),
        ));
}

/// Run `parse` through the cache, keyed by kind and literal
pub fn cached<F>(kind: ValueKind, literal: &str, parse: F) -> Option<Value>
where
    F: FnOnce(&str) -> Option<Value>,
{
    LITERAL_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(hit) = cache.get(&(kind, literal.to_string())) {
            return hit.clone();
        }
        let parsed = parse(literal);
        cache.put((kind, literal.to_string()), parsed.clone());
        parsed
    })
}
