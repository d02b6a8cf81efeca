/*!
 * Capability result caching.
 *
 * Identical inputs (same operation, same target language, same content) are
 * answered once per run, so a repeated paragraph costs a single model call and
 * re-processing it yields the same text.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::language_utils::TargetLanguage;

/// Which capability produced a cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Translate,
    DescribeImage,
    CommentCode,
}

/// Cache key: operation, language and a digest of the input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    operation: Operation,
    language: TargetLanguage,
    digest: [u8; 32],
}

impl CacheKey {
    fn new(operation: Operation, language: TargetLanguage, input: &[u8]) -> Self {
        Self {
            operation,
            language,
            digest: Sha256::digest(input).into(),
        }
    }
}

/// In-memory cache shared by clones
#[derive(Debug, Clone)]
pub struct CapabilityCache {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<CacheKey, String>>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
    /// Whether caching is enabled
    enabled: bool,
}

impl CapabilityCache {
    /// Create a new cache
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            enabled,
        }
    }

    /// Look up a previous result
    pub fn get(&self, operation: Operation, language: TargetLanguage, input: &[u8]) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::new(operation, language, input);
        match self.entries.read().get(&key) {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {:?} ({})", operation, language);
                Some(result.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result
    pub fn store(&self, operation: Operation, language: TargetLanguage, input: &[u8], result: &str) {
        if !self.enabled {
            return;
        }
        let key = CacheKey::new(operation, language, input);
        self.entries.write().insert(key, result.to_string());
    }

    /// (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        (hits, misses, hit_rate)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Capability cache cleared");
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new(true)
    }
}
