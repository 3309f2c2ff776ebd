// Common test utilities for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Once;

use chainrag::config::{
    Config, EmbeddingsConfig, EtherscanConfig, JobsConfig, LlmConfig, RetrievalConfig,
    ServerConfig, StorageConfig,
};
use chainrag::embeddings::{ApiConfig, EmbeddingProvider};
use chainrag::index::{IndexStore, VectorIndex};
use chainrag::models::{Direction, TransactionDocument, TxType};
use chainrag::tag::Tag;
use serde_json::{json, Value};
use wiremock::{Request, ResponseTemplate};

static INIT: Once = Once::new();

pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn test_config(data_dir: &Path) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        storage: StorageConfig {
            data_dir: data_dir.to_path_buf(),
        },
        embeddings: EmbeddingsConfig {
            model: format!("openai/{EMBEDDING_MODEL}"),
            dimensions: 2,
            ..EmbeddingsConfig::default()
        },
        llm: None,
        retrieval: RetrievalConfig::default(),
        jobs: JobsConfig { workers: 2 },
        etherscan: EtherscanConfig::default(),
    }
}

/// An Ollama-style model needs no key, so only the base URL points at the mock.
pub fn llm_config(base_url: &str, intent_cache_size: usize) -> LlmConfig {
    LlmConfig {
        model: "ollama/llama3".to_string(),
        api_key: None,
        base_url: Some(base_url.to_string()),
        timeout_secs: 5,
        max_retries: 0,
        temperature: 0.3,
        intent_timeout_secs: 5,
        intent_cache_size,
    }
}

pub fn embedding_provider(base_url: &str) -> EmbeddingProvider {
    EmbeddingProvider::from_api(
        ApiConfig {
            base_url: base_url.to_string(),
            api_key: Some("test-key".to_string()),
            model: EMBEDDING_MODEL.to_string(),
            timeout_secs: 5,
            max_retries: 0,
        },
        2,
        16,
    )
    .expect("embedding provider")
}

/// Answers every `/embeddings` request with `vector` once per input text.
pub fn constant_embeddings(vector: Vec<f32>) -> impl Fn(&Request) -> ResponseTemplate {
    move |request: &Request| {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let count = body["input"].as_array().map(Vec::len).unwrap_or(1);
        let data: Vec<Value> = (0..count)
            .map(|i| json!({ "index": i, "embedding": vector }))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "llama3",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn document(
    id: &str,
    tx_type: TxType,
    token: &str,
    direction: Direction,
    timestamp: i64,
) -> TransactionDocument {
    let label = match tx_type {
        TxType::NormalTx => "[NORMAL TRANSACTION]",
        TxType::Erc20Transfer => "[TOKEN TRANSFER]",
    };
    TransactionDocument {
        id: id.to_string(),
        text: format!("{label}\nId: {id}\nToken: {token}\nDirection: {direction}"),
        tx_type,
        token: token.to_string(),
        direction,
        timestamp,
        date: String::new(),
        tx_hash: id.to_string(),
        address: String::new(),
    }
}

/// Persist an index for `tag` the way a finished preparation would.
pub fn save_index(data_dir: &Path, tag: &Tag, entries: Vec<(TransactionDocument, Vec<f32>)>) {
    let mut index = VectorIndex::new(EMBEDDING_MODEL, 2);
    for (document, vector) in entries {
        index.insert(document, vector).expect("insert");
    }
    IndexStore::new(data_dir).save(tag, &index).expect("save index");
}

pub use serial_test::serial;
pub use tempfile;
pub use wiremock;
