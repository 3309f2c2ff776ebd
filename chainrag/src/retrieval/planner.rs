use std::time::Duration;

use super::IntentCache;
use crate::config::LlmConfig;
use crate::error::{ChainRagError, Result};
use crate::llm::{prompts, LlmProvider};
use crate::models::RetrievalIntent;

const DEFAULT_INTENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns a question into a [`RetrievalIntent`].
///
/// Extraction is best effort: an unavailable model, a timeout, an upstream
/// error or unparseable output all produce [`RetrievalIntent::default`].
#[derive(Clone)]
pub struct QueryPlanner {
    llm: LlmProvider,
    cache: Option<IntentCache>,
    timeout: Duration,
}

impl QueryPlanner {
    pub fn new(llm: LlmProvider) -> Self {
        let config = llm.config();
        let cache = config.and_then(|c: &LlmConfig| IntentCache::new(c.intent_cache_size));
        let timeout = config
            .map(|c| Duration::from_secs(c.intent_timeout_secs))
            .unwrap_or(DEFAULT_INTENT_TIMEOUT);

        Self {
            llm,
            cache,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn plan(&self, question: &str) -> RetrievalIntent {
        if !self.llm.is_available() {
            tracing::debug!("LLM unavailable; using default retrieval intent");
            return RetrievalIntent::default();
        }

        let cache_key = self.cache.as_ref().map(|c| c.generate_key(question));
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(intent) = cache.get(key) {
                tracing::debug!("Retrieval intent served from cache");
                return intent;
            }
        }

        match self.extract(question).await {
            Ok(intent) => {
                tracing::debug!(
                    sort = ?intent.sort,
                    limit = intent.limit,
                    filters = ?intent.filters,
                    "Extracted retrieval intent"
                );
                if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
                    cache.put(key, intent.clone());
                }
                intent
            }
            Err(e) => {
                tracing::warn!(error = %e, "Intent extraction failed; using default intent");
                RetrievalIntent::default()
            }
        }
    }

    async fn extract(&self, question: &str) -> Result<RetrievalIntent> {
        let prompt = prompts::intent_extraction_prompt(question);

        let raw = tokio::time::timeout(self.timeout, self.llm.complete_json(&prompt))
            .await
            .map_err(|_| {
                ChainRagError::UpstreamTimeout(format!(
                    "Intent extraction exceeded {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        if !raw.is_object() {
            return Err(ChainRagError::Llm(
                "Intent extraction did not return a JSON object".to_string(),
            ));
        }

        Ok(RetrievalIntent::from_extraction(&raw))
    }
}
