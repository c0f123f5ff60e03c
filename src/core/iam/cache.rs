//! Per-decision memoization
//!
//! A cache lives for exactly one decision. It never expires entries and is
//! never shared, so it needs no locking and cannot leak one request's
//! attributes into another.

use super::attribute::AttributeValue;
use ahash::AHashMap;

/// Memo table keyed by attribute reference text
pub enum DecisionCache {
    /// Each distinct key is computed at most once
    Memo {
        entries: AHashMap<String, Option<AttributeValue>>,
        hits: usize,
        misses: usize,
    },
    /// Computes every time and stores nothing
    Passthrough { misses: usize },
}

impl DecisionCache {
    /// Pick the variant for the configured memoization setting
    pub fn new(memoize: bool) -> Self {
        if memoize {
            Self::memo()
        } else {
            Self::passthrough()
        }
    }

    pub fn memo() -> Self {
        DecisionCache::Memo {
            entries: AHashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn passthrough() -> Self {
        DecisionCache::Passthrough { misses: 0 }
    }

    /// Return the value stored under `key`, computing it on first use
    pub fn fetch<F>(&mut self, key: &str, compute: F) -> Option<AttributeValue>
    where
        F: FnOnce() -> Option<AttributeValue>,
    {
        match self {
            DecisionCache::Memo {
                entries,
                hits,
                misses,
            } => {
                if let Some(cached) = entries.get(key) {
                    *hits += 1;
                    return cached.clone();
                }
                *misses += 1;
                let value = compute();
                entries.insert(key.to_string(), value.clone());
                value
            }
            DecisionCache::Passthrough { misses } => {
                *misses += 1;
                compute()
            }
        }
    }

    pub fn is_memoizing(&self) -> bool {
        matches!(self, DecisionCache::Memo { .. })
    }

    /// Number of lookups answered from storage
    pub fn hits(&self) -> usize {
        match self {
            DecisionCache::Memo { hits, .. } => *hits,
            DecisionCache::Passthrough { .. } => 0,
        }
    }

    /// Number of lookups that ran the computation
    pub fn misses(&self) -> usize {
        match self {
            DecisionCache::Memo { misses, .. } | DecisionCache::Passthrough { misses } => *misses,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DecisionCache::Memo { entries, .. } => entries.len(),
            DecisionCache::Passthrough { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
