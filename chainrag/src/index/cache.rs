use std::sync::Arc;

use dashmap::DashMap;

use super::{IndexStore, VectorIndex};
use crate::error::{ChainRagError, Result};
use crate::tag::Tag;

/// Process-lifetime map of loaded indexes, keyed by tag.
///
/// Each tag is an independent entry: loading, replacing or invalidating one
/// tag never blocks readers of another. Entries are never evicted.
pub struct IndexCache {
    store: IndexStore,
    loaded: DashMap<String, Arc<VectorIndex>>,
    // Bumped on every invalidation so a load that started earlier cannot
    // publish a pre-rebuild index afterwards.
    generations: DashMap<String, u64>,
}

impl IndexCache {
    pub fn new(store: IndexStore) -> Self {
        Self {
            store,
            loaded: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    /// Return the cached index for `tag`, loading it from storage on a miss.
    pub async fn get(&self, tag: &Tag) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.loaded.get(tag.as_str()) {
            return Ok(Arc::clone(&index));
        }

        let generation = self.generation(tag);
        let index = self.load(tag).await?;

        if !self.publish(tag, generation, Arc::clone(&index)) {
            tracing::debug!(tag = %tag, "Index invalidated during load; not caching");
        }

        Ok(index)
    }

    /// Remove any cached index for `tag`. No-op when absent.
    pub fn invalidate(&self, tag: &Tag) {
        let mut generation = self.generations.entry(tag.as_str().to_string()).or_insert(0);
        *generation += 1;
        if self.loaded.remove(tag.as_str()).is_some() {
            tracing::debug!(tag = %tag, "Invalidated cached index");
        }
    }

    /// Cache `index` only if no invalidation happened since `generation` was
    /// read. The generation entry stays locked across the compare and the
    /// insert; `invalidate` takes the same lock first.
    fn publish(&self, tag: &Tag, generation: u64, index: Arc<VectorIndex>) -> bool {
        let current = self.generations.entry(tag.as_str().to_string()).or_insert(0);
        if *current != generation {
            return false;
        }
        self.loaded.insert(tag.as_str().to_string(), index);
        true
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.loaded.contains_key(tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    fn generation(&self, tag: &Tag) -> u64 {
        self.generations.get(tag.as_str()).map(|g| *g).unwrap_or(0)
    }

    async fn load(&self, tag: &Tag) -> Result<Arc<VectorIndex>> {
        let store = self.store.clone();
        let owned_tag = tag.clone();

        let index = tokio::task::spawn_blocking(move || store.load(&owned_tag))
            .await
            .map_err(|e| ChainRagError::Internal(format!("Index load task failed: {e}")))??;

        tracing::debug!(tag = %tag, documents = index.len(), "Loaded index from storage");
        Ok(Arc::new(index))
    }
}
