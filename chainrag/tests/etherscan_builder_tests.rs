mod common;

use std::sync::Arc;
use std::time::Duration;

use chainrag::builder::{
    parse_jsonl, DocumentStoreBuilder, EtherscanClient, EtherscanStoreBuilder,
};
use chainrag::config::EtherscanConfig;
use chainrag::error::ChainRagError;
use chainrag::index::{IndexCache, IndexStore};
use chainrag::jobs::JobManager;
use chainrag::models::{Direction, JobState, JobStatus, TxType};
use chainrag::tag::Tag;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{constant_embeddings, embedding_provider, EMBEDDING_MODEL};

const ACCOUNT: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

fn etherscan_config(server: &MockServer, api_key: Option<&str>) -> EtherscanConfig {
    EtherscanConfig {
        api_key: api_key.map(str::to_string),
        base_url: format!("{}/v2/api", server.uri()),
        chain_id: "1".to_string(),
        tx_limit: 50,
        timeout_secs: 5,
    }
}

fn builder(server: &MockServer, data_dir: &std::path::Path) -> EtherscanStoreBuilder {
    let etherscan = EtherscanClient::new(etherscan_config(server, Some("etherscan-key"))).unwrap();
    EtherscanStoreBuilder::new(etherscan, embedding_provider(&server.uri()), data_dir)
}

fn ok(result: Value) -> Value {
    json!({ "status": "1", "message": "OK", "result": result })
}

fn no_transactions() -> Value {
    json!({ "status": "0", "message": "No transactions found", "result": [] })
}

async fn mount_action(server: &MockServer, action: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v2/api"))
        .and(query_param("action", action))
        .and(query_param("address", ACCOUNT))
        .and(query_param("sort", "desc"))
        .and(query_param("offset", "50"))
        .and(query_param("apikey", "etherscan-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(constant_embeddings(vec![0.6, 0.8]))
        .mount(server)
        .await;
}

fn normal_rows() -> Value {
    json!([
        {
            "hash": "0xaaa",
            "from": "0x1111111111111111111111111111111111111111",
            "to": ACCOUNT.to_lowercase(),
            "value": "1500000000000000000",
            "timeStamp": "1700000000"
        },
        {
            "hash": "0xbbb",
            "from": ACCOUNT.to_lowercase(),
            "to": "0x2222222222222222222222222222222222222222",
            "value": "250000000000000000",
            "timeStamp": "1690000000"
        }
    ])
}

fn token_rows() -> Value {
    json!([
        {
            "hash": "0xccc",
            "from": ACCOUNT,
            "to": "0x3333333333333333333333333333333333333333",
            "value": "100000000",
            "timeStamp": "1695000000",
            "tokenSymbol": "USDT",
            "tokenName": "Tether USD",
            "tokenDecimal": "6"
        },
        {
            "hash": "0xccc",
            "from": "0x4444444444444444444444444444444444444444",
            "to": ACCOUNT,
            "value": "5000000000000000000",
            "timeStamp": "1695000000",
            "tokenSymbol": "DAI",
            "tokenName": "Dai Stablecoin",
            "tokenDecimal": "18"
        }
    ])
}

#[tokio::test]
async fn test_fetch_writes_raw_and_processed_documents() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_action(&server, "txlist", ok(normal_rows())).await;
    mount_action(&server, "tokentx", ok(token_rows())).await;

    let builder = builder(&server, dir.path());
    let tag = Tag::normalize(ACCOUNT);

    let count = builder.fetch(&tag, ACCOUNT).await.unwrap();
    assert_eq!(count, 4);

    let raw_dir = dir.path().join("raw");
    assert!(raw_dir.join(format!("{tag}_normal_txs.json")).exists());
    assert!(raw_dir.join(format!("{tag}_erc20_transfers.json")).exists());

    let processed = std::fs::read_to_string(builder.processed_path(&tag)).unwrap();
    let documents = parse_jsonl(&processed);
    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["normal_0xaaa", "normal_0xbbb", "erc20_0xccc_0", "erc20_0xccc_1"]
    );

    assert_eq!(documents[0].direction, Direction::Incoming);
    assert_eq!(documents[0].date, "2023-11-14 22:13:20");
    assert!(documents[0].text.contains("Amount: 1.500000 ETH"));
    assert_eq!(documents[1].direction, Direction::Outgoing);

    assert_eq!(documents[2].tx_type, TxType::Erc20Transfer);
    assert_eq!(documents[2].token, "USDT");
    assert_eq!(documents[2].direction, Direction::Outgoing);
    assert!(documents[2].text.contains("Amount: 100.0000 USDT"));
    assert_eq!(documents[3].direction, Direction::Incoming);
}

#[tokio::test]
async fn test_no_transactions_found_is_empty_not_error() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_action(&server, "txlist", ok(normal_rows())).await;
    mount_action(&server, "tokentx", no_transactions()).await;

    let builder = builder(&server, dir.path());
    let tag = Tag::normalize(ACCOUNT);

    assert_eq!(builder.fetch(&tag, ACCOUNT).await.unwrap(), 2);
}

#[tokio::test]
async fn test_etherscan_error_status_fails_fetch() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_action(
        &server,
        "txlist",
        json!({ "status": "0", "message": "NOTOK", "result": "Max rate limit reached" }),
    )
    .await;

    let builder = builder(&server, dir.path());
    let result = builder.fetch(&Tag::normalize(ACCOUNT), ACCOUNT).await;

    match result {
        Err(ChainRagError::Etherscan(message)) => {
            assert!(message.contains("Max rate limit reached"));
        }
        other => panic!("Expected Etherscan error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_api_key_fails_fetch() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    let etherscan = EtherscanClient::new(etherscan_config(&server, None)).unwrap();
    let builder = EtherscanStoreBuilder::new(etherscan, embedding_provider(&server.uri()), dir.path());

    let result = builder.fetch(&Tag::normalize(ACCOUNT), ACCOUNT).await;
    assert!(matches!(result, Err(ChainRagError::Etherscan(_))));
}

#[tokio::test]
async fn test_index_embeds_and_persists_documents() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_action(&server, "txlist", ok(normal_rows())).await;
    mount_action(&server, "tokentx", ok(token_rows())).await;
    mount_embeddings(&server).await;

    let builder = builder(&server, dir.path());
    let tag = Tag::normalize(ACCOUNT);

    builder.fetch(&tag, ACCOUNT).await.unwrap();
    assert_eq!(builder.index(&tag).await.unwrap(), 4);

    let index = IndexStore::new(dir.path()).load(&tag).unwrap();
    assert_eq!(index.len(), 4);
    assert_eq!(index.model, EMBEDDING_MODEL);
    assert_eq!(index.dimensions, 2);
}

#[tokio::test]
async fn test_index_without_documents_fails() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_action(&server, "txlist", no_transactions()).await;
    mount_action(&server, "tokentx", no_transactions()).await;

    let builder = builder(&server, dir.path());
    let tag = Tag::normalize(ACCOUNT);

    assert_eq!(builder.fetch(&tag, ACCOUNT).await.unwrap(), 0);
    assert!(matches!(
        builder.index(&tag).await,
        Err(ChainRagError::Build(_))
    ));
}

async fn wait_for_terminal(manager: &JobManager, tag: &Tag) -> JobStatus {
    for _ in 0..300 {
        let status = manager.status(tag);
        if status.state.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job for {tag} never finished");
}

#[tokio::test]
async fn test_preparation_job_end_to_end() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_action(&server, "txlist", ok(normal_rows())).await;
    mount_action(&server, "tokentx", ok(token_rows())).await;
    mount_embeddings(&server).await;

    let cache = Arc::new(IndexCache::new(IndexStore::new(dir.path())));
    let manager = JobManager::new(Arc::new(builder(&server, dir.path())), cache.clone(), 1);
    let tag = Tag::normalize(ACCOUNT);

    assert_eq!(manager.trigger(&tag, ACCOUNT, false).state, JobState::Queued);

    let status = wait_for_terminal(&manager, &tag).await;
    assert_eq!(status.state, JobState::Done);
    assert!(status.message.contains('4'));
    assert!(cache.contains(&tag));
    assert_eq!(cache.get(&tag).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_preparation_job_reports_fetch_failure() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_action(
        &server,
        "txlist",
        json!({ "status": "0", "message": "NOTOK", "result": "Invalid API Key" }),
    )
    .await;

    let cache = Arc::new(IndexCache::new(IndexStore::new(dir.path())));
    let manager = JobManager::new(Arc::new(builder(&server, dir.path())), cache.clone(), 1);
    let tag = Tag::normalize(ACCOUNT);

    manager.trigger(&tag, ACCOUNT, false);

    let status = wait_for_terminal(&manager, &tag).await;
    assert_eq!(status.state, JobState::Error);
    assert!(status.message.contains("Invalid API Key"));
    assert!(!cache.contains(&tag));
}
