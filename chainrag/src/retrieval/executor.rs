use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::embeddings::EmbeddingProvider;
use crate::error::{ChainRagError, Result};
use crate::index::{IndexCache, VectorIndex};
use crate::models::{RetrievalIntent, SortOrder, TransactionDocument};
use crate::tag::Tag;

#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// Documents in final presentation order.
    Found(Vec<TransactionDocument>),
    /// Nothing matched. A success, not an error.
    NoMatches,
}

impl RetrievalOutcome {
    fn from_documents(documents: Vec<TransactionDocument>) -> Self {
        if documents.is_empty() {
            Self::NoMatches
        } else {
            Self::Found(documents)
        }
    }

    pub fn documents(&self) -> &[TransactionDocument] {
        match self {
            Self::Found(documents) => documents,
            Self::NoMatches => &[],
        }
    }
}

/// Apply an intent to a loaded index.
///
/// Without a sort the top `limit` filtered neighbours are returned in
/// similarity order. With a sort, up to `wide_net_pool` filtered candidates
/// are fetched, ordered by timestamp (ties by ascending id) and only then
/// cut to `limit`.
pub fn execute_plan(
    index: &VectorIndex,
    query_vector: &[f32],
    intent: &RetrievalIntent,
    wide_net_pool: usize,
) -> RetrievalOutcome {
    let documents = match intent.sort {
        None => index
            .search(query_vector, intent.limit, &intent.filters)
            .into_iter()
            .map(|scored| scored.document)
            .collect(),
        Some(order) => {
            let pool = wide_net_pool.max(intent.limit);
            let mut candidates: Vec<TransactionDocument> = index
                .search(query_vector, pool, &intent.filters)
                .into_iter()
                .map(|scored| scored.document)
                .collect();

            candidates.sort_by(|a, b| chronological(a, b, order));
            candidates.truncate(intent.limit);
            candidates
        }
    };

    RetrievalOutcome::from_documents(documents)
}

fn chronological(a: &TransactionDocument, b: &TransactionDocument, order: SortOrder) -> Ordering {
    let by_time = match order {
        SortOrder::Desc => b.timestamp.cmp(&a.timestamp),
        SortOrder::Asc => a.timestamp.cmp(&b.timestamp),
    };
    by_time.then_with(|| a.id.cmp(&b.id))
}

/// Resolves a tag's index, embeds the question and runs the plan.
#[derive(Clone)]
pub struct Retriever {
    cache: Arc<IndexCache>,
    embeddings: EmbeddingProvider,
    wide_net_pool: usize,
    embed_timeout: Duration,
}

impl Retriever {
    pub fn new(
        cache: Arc<IndexCache>,
        embeddings: EmbeddingProvider,
        wide_net_pool: usize,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            embeddings,
            wide_net_pool,
            embed_timeout,
        }
    }

    pub async fn retrieve(
        &self,
        tag: &Tag,
        question: &str,
        intent: &RetrievalIntent,
    ) -> Result<RetrievalOutcome> {
        let index = self.cache.get(tag).await?;

        if index.model != self.embeddings.model_name() {
            tracing::warn!(
                tag = %tag,
                index_model = %index.model,
                query_model = %self.embeddings.model_name(),
                "Index was built with a different embedding model"
            );
        }

        let query_vector =
            tokio::time::timeout(self.embed_timeout, self.embeddings.embed_query(question))
                .await
                .map_err(|_| {
                    ChainRagError::UpstreamTimeout("Query embedding timed out".to_string())
                })??;

        let outcome = execute_plan(&index, &query_vector, intent, self.wide_net_pool);
        let mode = if intent.is_sorted() { "wide_net" } else { "direct" };
        tracing::debug!(
            tag = %tag,
            mode,
            results = outcome.documents().len(),
            "Retrieval complete"
        );

        Ok(outcome)
    }
}
