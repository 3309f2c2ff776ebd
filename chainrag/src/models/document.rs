use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    NormalTx,
    Erc20Transfer,
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NormalTx => write!(f, "normal_tx"),
            Self::Erc20Transfer => write!(f, "erc20_transfer"),
        }
    }
}

impl std::str::FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal_tx" => Ok(Self::NormalTx),
            "erc20_transfer" => Ok(Self::Erc20Transfer),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => write!(f, "Incoming"),
            Self::Outgoing => write!(f, "Outgoing"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incoming" | "in" => Ok(Self::Incoming),
            "outgoing" | "out" => Ok(Self::Outgoing),
            _ => Err(format!("Unknown direction: {s}")),
        }
    }
}

fn default_token() -> String {
    "ETH".to_string()
}

/// One indexed transaction record.
///
/// `text` is what the answer model reads; the remaining fields are the
/// metadata used for attribute filters and chronological ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionDocument {
    /// `normal_<hash>` or `erc20_<hash>_<ordinal>`.
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    #[serde(default = "default_token")]
    pub token: String,
    pub direction: Direction,
    /// Seconds since epoch. Values that cannot be read as an integer become 0.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: i64,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "tx_hash", alias = "txHash", default)]
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(coerce_timestamp(&raw))
}

/// Read a timestamp from loosely typed JSON, falling back to 0 (oldest).
pub fn coerce_timestamp(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}
