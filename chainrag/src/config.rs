use serde::Deserialize;
use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: Option<LlmConfig>,
    pub retrieval: RetrievalConfig,
    pub jobs: JobsConfig,
    pub etherscan: EtherscanConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Root of all tag-addressed files: `raw/`, `processed/` and `vector_db/<tag>/`.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// LLM configuration for intent extraction and answer synthesis
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    // Upper bound on a single intent extraction before the default intent is used
    pub intent_timeout_secs: u64,
    // 0 disables the intent cache
    pub intent_cache_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Candidate pool size fetched in wide-net mode before chronological re-sort.
    pub wide_net_pool: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Maximum number of preparation jobs building at the same time.
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtherscanConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chain_id: String,
    pub tx_limit: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 64,
            api_key: None,
            base_url: None,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            wide_net_pool: 1000,
        }
    }
}

impl Default for EtherscanConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.etherscan.io/v2/api".to_string(),
            chain_id: "1".to_string(),
            tx_limit: 10_000,
            timeout_secs: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let embedding_defaults = EmbeddingsConfig::default();
        let etherscan_defaults = EtherscanConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("CHAINRAG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("CHAINRAG_PORT", 8000),
            },
            storage: StorageConfig {
                data_dir: env::var("CHAINRAG_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data")),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL").unwrap_or(embedding_defaults.model),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", embedding_defaults.dimensions),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", embedding_defaults.batch_size),
                api_key: env_non_empty("EMBEDDING_API_KEY"),
                base_url: env_non_empty("EMBEDDING_BASE_URL"),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", embedding_defaults.timeout_secs),
                max_retries: parse_env_or(
                    "EMBEDDING_MAX_RETRIES",
                    embedding_defaults.max_retries,
                ),
            },
            llm: env_non_empty("LLM_MODEL").map(|model| LlmConfig {
                model,
                api_key: env_non_empty("LLM_API_KEY"),
                base_url: env_non_empty("LLM_BASE_URL"),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
                temperature: parse_env_or("LLM_TEMPERATURE", 0.3),
                intent_timeout_secs: parse_env_or("INTENT_TIMEOUT_SECS", 10),
                intent_cache_size: parse_env_or("INTENT_CACHE_SIZE", 256),
            }),
            retrieval: RetrievalConfig {
                wide_net_pool: parse_env_or("WIDE_NET_POOL", 1000).max(1),
            },
            jobs: JobsConfig {
                workers: parse_env_or("PREPARATION_WORKERS", 2).max(1),
            },
            etherscan: EtherscanConfig {
                api_key: env_non_empty("ETHERSCAN_API_KEY"),
                base_url: env::var("ETHERSCAN_BASE_URL").unwrap_or(etherscan_defaults.base_url),
                chain_id: env::var("ETHERSCAN_CHAIN_ID").unwrap_or(etherscan_defaults.chain_id),
                tx_limit: parse_env_or("ETHERSCAN_TX_LIMIT", etherscan_defaults.tx_limit),
                timeout_secs: parse_env_or("ETHERSCAN_TIMEOUT", etherscan_defaults.timeout_secs),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known providers that use OpenAI-compatible APIs
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
///
/// `openai/gpt-4o-mini` selects the `openai` HTTP backend, while a name whose
/// prefix is not a known provider (e.g. `sentence-transformers/all-MiniLM-L6-v2`)
/// is treated as a local model and returned whole.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}
