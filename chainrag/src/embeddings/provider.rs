use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use super::api::{default_base_url, ApiConfig, EmbeddingApiClient};
use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::error::{ChainRagError, Result};

#[derive(Clone)]
enum EmbeddingBackend {
    Local {
        model: Arc<Mutex<TextEmbedding>>,
    },
    Api(EmbeddingApiClient),
}

/// Turns transaction texts and questions into vectors.
///
/// The same provider must embed both sides: an index built with one model
/// cannot be searched with vectors from another.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    model_name: String,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);

        if provider == "local" {
            return Self::new_local(config, model_name);
        }

        let api_config = ApiConfig {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string()),
            api_key: config.api_key.clone(),
            model: model_name.to_string(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        };

        Self::from_api(api_config, config.dimensions, config.batch_size)
    }

    /// Build a provider backed by an OpenAI-compatible `/embeddings` endpoint.
    pub fn from_api(api_config: ApiConfig, dimensions: usize, batch_size: usize) -> Result<Self> {
        let model_name = api_config.model.clone();
        let client = EmbeddingApiClient::new(api_config, dimensions)?;

        Ok(Self {
            backend: EmbeddingBackend::Api(client),
            model_name,
            dimensions,
            batch_size: batch_size.max(1),
        })
    }

    fn new_local(config: &EmbeddingsConfig, model_name: &str) -> Result<Self> {
        let embedding_model = resolve_embedding_model(model_name)?;
        let model = TextEmbedding::try_new(
            InitOptions::new(embedding_model).with_show_download_progress(true),
        )
        .map_err(|e| ChainRagError::Embedding(e.to_string()))?;

        tracing::info!(model = model_name, "Loaded local embedding model");

        Ok(Self {
            backend: EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
            },
            model_name: model_name.to_string(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            EmbeddingBackend::Local { model } => {
                let model = Arc::clone(model);
                let batch_size = self.batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        ChainRagError::Embedding(format!("Embedding model lock poisoned: {e}"))
                    })?;
                    model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| ChainRagError::Embedding(e.to_string()))
                })
                .await
                .map_err(|e| ChainRagError::Embedding(format!("Embedding worker failed: {e}")))?
            }
            EmbeddingBackend::Api(client) => client.embed(&texts).await,
        }
    }

    /// Embed transaction texts for indexing, `batch_size` at a time.
    pub async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let mut embedded = self.embed_batch(batch.to_vec()).await?;
            all_embeddings.append(&mut embedded);
            tokio::task::yield_now().await;
        }
        Ok(all_embeddings)
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChainRagError::Embedding("No embedding generated".to_string()))
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn resolve_embedding_model(model_name: &str) -> Result<EmbeddingModel> {
    match model_name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            Ok(EmbeddingModel::AllMiniLML12V2)
        }
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(ChainRagError::Embedding(format!(
            "Unsupported local embedding model: {other}"
        ))),
    }
}
