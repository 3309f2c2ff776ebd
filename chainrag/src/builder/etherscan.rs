use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::documents::{convert_to_documents, parse_jsonl, to_jsonl};
use super::DocumentStoreBuilder;
use crate::config::EtherscanConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{ChainRagError, Result};
use crate::index::{IndexStore, VectorIndex};
use crate::tag::Tag;

const NO_TRANSACTIONS: &str = "No transactions found";

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

/// Thin client for the Etherscan v2 `account` module.
#[derive(Clone)]
pub struct EtherscanClient {
    client: Client,
    config: EtherscanConfig,
}

impl EtherscanClient {
    pub fn new(config: EtherscanConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChainRagError::Etherscan(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub async fn normal_transactions(&self, address: &str) -> Result<Vec<Value>> {
        self.account_list(address, "txlist", &[("startblock", "0"), ("endblock", "99999999")])
            .await
    }

    pub async fn erc20_transfers(&self, address: &str) -> Result<Vec<Value>> {
        self.account_list(address, "tokentx", &[]).await
    }

    async fn account_list(
        &self,
        address: &str,
        action: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<Value>> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ChainRagError::Etherscan("ETHERSCAN_API_KEY is not configured".to_string())
        })?;

        let offset = self.config.tx_limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("chainid", self.config.chain_id.as_str()),
            ("module", "account"),
            ("action", action),
            ("address", address),
            ("page", "1"),
            ("offset", offset.as_str()),
            ("sort", "desc"),
            ("apikey", api_key),
        ];
        query.extend_from_slice(extra);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainRagError::UpstreamTimeout(format!("Etherscan {action} timed out"))
                } else {
                    ChainRagError::Etherscan(format!("Etherscan {action} request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainRagError::Etherscan(format!(
                "Etherscan {action} returned {status}: {body}"
            )));
        }

        let body: EtherscanResponse = response.json().await.map_err(|e| {
            ChainRagError::Etherscan(format!("Invalid Etherscan {action} response: {e}"))
        })?;

        interpret_response(action, body)
    }
}

fn interpret_response(action: &str, body: EtherscanResponse) -> Result<Vec<Value>> {
    if body.status == "1" {
        return match body.result {
            Value::Array(items) => Ok(items),
            other => Err(ChainRagError::Etherscan(format!(
                "Etherscan {action} result is not a list: {other}"
            ))),
        };
    }

    if body.message.contains(NO_TRANSACTIONS) {
        return Ok(Vec::new());
    }

    let detail = match &body.result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Err(ChainRagError::Etherscan(format!(
        "Etherscan {action} failed: {} ({detail})",
        body.message
    )))
}

/// Builds an account's document store from Etherscan data.
///
/// Layout under `data_dir`:
/// - `raw/<tag>_normal_txs.json`, `raw/<tag>_erc20_transfers.json`
/// - `processed/<tag>_documents.jsonl`
/// - `vector_db/<tag>/index.json`
pub struct EtherscanStoreBuilder {
    etherscan: EtherscanClient,
    embeddings: EmbeddingProvider,
    store: IndexStore,
    data_dir: PathBuf,
}

impl EtherscanStoreBuilder {
    pub fn new(
        etherscan: EtherscanClient,
        embeddings: EmbeddingProvider,
        data_dir: impl AsRef<Path>,
    ) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            etherscan,
            embeddings,
            store: IndexStore::new(&data_dir),
            data_dir,
        }
    }

    fn raw_path(&self, tag: &Tag, kind: &str) -> PathBuf {
        self.data_dir.join("raw").join(format!("{tag}_{kind}.json"))
    }

    pub fn processed_path(&self, tag: &Tag) -> PathBuf {
        self.data_dir
            .join("processed")
            .join(format!("{tag}_documents.jsonl"))
    }
}

async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

#[async_trait]
impl DocumentStoreBuilder for EtherscanStoreBuilder {
    async fn fetch(&self, tag: &Tag, account: &str) -> Result<usize> {
        let account = account.trim();
        if account.is_empty() {
            return Err(ChainRagError::Validation("Account must not be empty".to_string()));
        }

        let normal = self.etherscan.normal_transactions(account).await?;
        let erc20 = self.etherscan.erc20_transfers(account).await?;
        tracing::info!(
            tag = %tag,
            normal = normal.len(),
            erc20 = erc20.len(),
            "Fetched transactions"
        );

        write_file(
            &self.raw_path(tag, "normal_txs"),
            serde_json::to_vec_pretty(&normal)?,
        )
        .await?;
        write_file(
            &self.raw_path(tag, "erc20_transfers"),
            serde_json::to_vec_pretty(&erc20)?,
        )
        .await?;

        let documents = convert_to_documents(account, &normal, &erc20);
        write_file(&self.processed_path(tag), to_jsonl(&documents)?).await?;

        Ok(documents.len())
    }

    async fn index(&self, tag: &Tag) -> Result<usize> {
        let path = self.processed_path(tag);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ChainRagError::Build(format!("Cannot read {}: {e}", path.display()))
        })?;

        let documents = parse_jsonl(&content);
        if documents.is_empty() {
            return Err(ChainRagError::Build(format!(
                "No transactions to index for '{tag}'"
            )));
        }

        let texts = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embeddings.embed_documents(texts).await?;
        if vectors.len() != documents.len() {
            return Err(ChainRagError::Embedding(format!(
                "Embedded {} of {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(self.embeddings.dimensions());
        let mut index = VectorIndex::new(self.embeddings.model_name(), dimensions);
        for (document, vector) in documents.into_iter().zip(vectors) {
            index.insert(document, vector)?;
        }

        let count = index.len();
        let store = self.store.clone();
        let owned_tag = tag.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&owned_tag, &index))
            .await
            .map_err(|e| ChainRagError::Internal(format!("Index save task failed: {e}")))??;

        tracing::info!(tag = %tag, documents = count, path = %saved.display(), "Saved index");
        Ok(count)
    }
}
