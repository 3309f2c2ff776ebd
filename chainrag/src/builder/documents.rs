use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Direction, TransactionDocument, TxType};

/// Fields shared by Etherscan `txlist` and `tokentx` rows. Etherscan encodes
/// every number as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtherscanTx {
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub time_stamp: String,
    #[serde(default)]
    pub token_symbol: Option<String>,
    #[serde(default)]
    pub token_name: Option<String>,
    #[serde(default)]
    pub token_decimal: Option<String>,
}

/// Token recorded for native transfers and for token rows missing a symbol.
pub const DEFAULT_TOKEN: &str = "ETH";

fn direction_for(account: &str, from: &str) -> Direction {
    if from.eq_ignore_ascii_case(account) {
        Direction::Outgoing
    } else {
        Direction::Incoming
    }
}

fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn wei_to_eth(value: &str) -> f64 {
    value.trim().parse::<f64>().map(|wei| wei / 1e18).unwrap_or(0.0)
}

fn token_amount(value: &str, decimals: Option<&str>) -> f64 {
    let Some(decimals) = decimals.and_then(|d| d.trim().parse::<i32>().ok()) else {
        return 0.0;
    };
    value
        .trim()
        .parse::<f64>()
        .map(|raw| raw / 10f64.powi(decimals))
        .unwrap_or(0.0)
}

pub fn normal_tx_document(account: &str, tx: &EtherscanTx) -> TransactionDocument {
    let timestamp = tx.time_stamp.trim().parse::<i64>().unwrap_or(0);
    let date = format_date(timestamp);
    let direction = direction_for(account, &tx.from);
    let amount = wei_to_eth(&tx.value);

    let text = format!(
        "[NORMAL TRANSACTION]\n\
         Type: Ethereum Transfer\n\
         Date: {date}\n\
         Amount: {amount:.6} ETH\n\
         Direction: {direction}\n\
         From: {from}\n\
         To: {to}\n\
         Hash: {hash}\n",
        from = tx.from,
        to = tx.to,
        hash = tx.hash,
    );

    TransactionDocument {
        id: format!("normal_{}", tx.hash),
        text,
        tx_type: TxType::NormalTx,
        token: DEFAULT_TOKEN.to_string(),
        direction,
        timestamp,
        date,
        tx_hash: tx.hash.clone(),
        address: account.to_string(),
    }
}

/// `ordinal` keeps ids unique when one transaction hash carries several transfers.
pub fn erc20_transfer_document(account: &str, tx: &EtherscanTx, ordinal: usize) -> TransactionDocument {
    let timestamp = tx.time_stamp.trim().parse::<i64>().unwrap_or(0);
    let date = format_date(timestamp);
    let direction = direction_for(account, &tx.from);
    let amount = token_amount(&tx.value, tx.token_decimal.as_deref());
    let symbol = tx
        .token_symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_TOKEN)
        .to_string();
    let name = tx.token_name.clone().unwrap_or_default();

    let text = format!(
        "[TOKEN TRANSFER]\n\
         Type: ERC20 Transfer\n\
         Date: {date}\n\
         Token: {symbol} ({name})\n\
         Amount: {amount:.4} {symbol}\n\
         Direction: {direction}\n\
         From: {from}\n\
         To: {to}\n\
         Hash: {hash}\n",
        from = tx.from,
        to = tx.to,
        hash = tx.hash,
    );

    TransactionDocument {
        id: format!("erc20_{}_{ordinal}", tx.hash),
        text,
        tx_type: TxType::Erc20Transfer,
        token: symbol,
        direction,
        timestamp,
        date,
        tx_hash: tx.hash.clone(),
        address: account.to_string(),
    }
}

fn read_row(kind: &str, position: usize, row: &Value) -> Option<EtherscanTx> {
    match serde_json::from_value(row.clone()) {
        Ok(tx) => Some(tx),
        Err(e) => {
            tracing::warn!(kind, position, error = %e, "Skipping unreadable Etherscan row");
            None
        }
    }
}

/// Convert raw Etherscan rows into documents. ERC-20 ordinals are positions in
/// the raw `tokentx` list, so skipping an unreadable row never shifts the ids
/// of the rows after it.
pub fn convert_to_documents(
    account: &str,
    normal_rows: &[Value],
    erc20_rows: &[Value],
) -> Vec<TransactionDocument> {
    let normal = normal_rows
        .iter()
        .enumerate()
        .filter_map(|(position, row)| read_row("txlist", position, row))
        .map(|tx| normal_tx_document(account, &tx));
    let erc20 = erc20_rows
        .iter()
        .enumerate()
        .filter_map(|(ordinal, row)| {
            read_row("tokentx", ordinal, row).map(|tx| erc20_transfer_document(account, &tx, ordinal))
        });
    normal.chain(erc20).collect()
}

/// One JSON document per line.
pub fn to_jsonl(documents: &[TransactionDocument]) -> serde_json::Result<String> {
    let mut out = String::new();
    for document in documents {
        out.push_str(&serde_json::to_string(document)?);
        out.push('\n');
    }
    Ok(out)
}

/// Parse JSONL, skipping blank and malformed lines.
pub fn parse_jsonl(content: &str) -> Vec<TransactionDocument> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match serde_json::from_str(line) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::warn!(line = number + 1, error = %e, "Skipping malformed document line");
                None
            }
        })
        .collect()
}
