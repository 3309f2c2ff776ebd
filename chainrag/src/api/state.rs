use std::sync::Arc;
use std::time::Duration;

use crate::builder::DocumentStoreBuilder;
use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexCache, IndexStore};
use crate::jobs::JobManager;
use crate::llm::LlmProvider;
use crate::retrieval::{QueryPlanner, Retriever};
use crate::services::ChatService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub embeddings: EmbeddingProvider,
    pub llm: LlmProvider,
    /// Shared by the job manager (invalidate, warm) and the query path (read).
    pub cache: Arc<IndexCache>,
    pub jobs: JobManager,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(
        config: Config,
        embeddings: EmbeddingProvider,
        llm: LlmProvider,
        builder: Arc<dyn DocumentStoreBuilder>,
    ) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(IndexCache::new(IndexStore::new(&config.storage.data_dir)));

        let jobs = JobManager::new(builder, cache.clone(), config.jobs.workers);

        let planner = QueryPlanner::new(llm.clone());
        let retriever = Retriever::new(
            cache.clone(),
            embeddings.clone(),
            config.retrieval.wide_net_pool,
            Duration::from_secs(config.embeddings.timeout_secs),
        );
        let chat = ChatService::new(cache.clone(), planner, retriever, llm.clone());

        Self {
            config,
            embeddings,
            llm,
            cache,
            jobs,
            chat,
        }
    }
}
