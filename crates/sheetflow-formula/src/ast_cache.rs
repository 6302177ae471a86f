//! Parsed formula cache
//!
//! Entries are keyed by formula text plus the offset the text was read at,
//! because a shared formula parses to a different tree at every position.

use crate::ast::FormulaExpr;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Default number of parsed formulas kept
pub const DEFAULT_AST_CACHE_CAPACITY: usize = 100_000;

/// Cache key: formula text and the (column, row) offset it was parsed at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AstCacheKey {
    pub formula: String,
    pub x: i64,
    pub y: i64,
}

impl AstCacheKey {
    pub fn new(formula: impl Into<String>, x: i64, y: i64) -> Self {
        Self {
            formula: formula.into(),
            x,
            y,
        }
    }
}

/// Size-bounded LRU cache of parsed formulas, shared across passes.
///
/// Stored trees are handed out as `Arc`s and never mutated.
#[derive(Debug)]
pub struct AstCache {
    entries: Mutex<LruCache<AstCacheKey, Arc<FormulaExpr>>>,
    capacity: NonZeroUsize,
}

impl AstCache {
    /// Create a cache holding at most `capacity` trees (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Look up a tree, marking it most recently used
    pub fn get(&self, key: &AstCacheKey) -> Option<Arc<FormulaExpr>> {
        self.lock().get(key).cloned()
    }

    /// Store a tree, silently evicting the least recently used one when full
    pub fn set(&self, key: AstCacheKey, node: Arc<FormulaExpr>) {
        self.lock().put(key, node);
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<AstCacheKey, Arc<FormulaExpr>>> {
        // Entries are immutable, so a panic elsewhere cannot leave them half-written
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AstCache {
    fn default() -> Self {
        Self::new(DEFAULT_AST_CACHE_CAPACITY)
    }
}
