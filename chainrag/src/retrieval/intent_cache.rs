use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::RetrievalIntent;

/// Thread-safe LRU cache of successfully extracted intents.
///
/// Keys are hashes of the trimmed question text.
#[derive(Clone)]
pub struct IntentCache {
    cache: Arc<Mutex<LruCache<String, RetrievalIntent>>>,
}

impl IntentCache {
    /// Returns `None` for a capacity of 0, which disables caching.
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    pub fn get(&self, key: &str) -> Option<RetrievalIntent> {
        self.lock().get(key).cloned()
    }

    pub fn put(&self, key: String, intent: RetrievalIntent) {
        self.lock().put(key, intent);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generate_key(&self, question: &str) -> String {
        let mut hasher = DefaultHasher::new();
        question.trim().as_bytes().hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, RetrievalIntent>> {
        // Entries are plain values; a panic mid-put cannot leave one half-written.
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
