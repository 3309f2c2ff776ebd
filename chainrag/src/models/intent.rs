use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Direction, TransactionDocument, TxType};

pub const DEFAULT_LIMIT: usize = 5;
pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Latest first.
    Desc,
}

impl SortOrder {
    fn from_value(value: &Value) -> Option<Self> {
        match value.as_str()? {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Attribute-equality predicates, ANDed together. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<TxType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.tx_type.is_none() && self.direction.is_none()
    }

    pub fn matches(&self, doc: &TransactionDocument) -> bool {
        if let Some(token) = &self.token {
            if !doc.token.eq_ignore_ascii_case(token) {
                return false;
            }
        }
        if let Some(tx_type) = self.tx_type {
            if doc.tx_type != tx_type {
                return false;
            }
        }
        if let Some(direction) = self.direction {
            if doc.direction != direction {
                return false;
            }
        }
        true
    }

    fn from_value(value: &Value) -> Self {
        let mut filter = Self::default();
        let Some(map) = value.as_object() else {
            return filter;
        };

        for (key, raw) in map {
            let Some(text) = raw.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };

            match key.as_str() {
                "token" => filter.token = Some(text.to_string()),
                "type" => match text.parse::<TxType>() {
                    Ok(tx_type) => filter.tx_type = Some(tx_type),
                    Err(e) => tracing::warn!(error = %e, "Dropping unusable type filter"),
                },
                "direction" => match text.parse::<Direction>() {
                    Ok(direction) => filter.direction = Some(direction),
                    Err(e) => tracing::warn!(error = %e, "Dropping unusable direction filter"),
                },
                other => tracing::debug!(key = other, "Ignoring unsupported filter key"),
            }
        }

        filter
    }
}

/// Structured retrieval requirements extracted from a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalIntent {
    pub filters: MetadataFilter,
    pub sort: Option<SortOrder>,
    pub limit: usize,
}

impl Default for RetrievalIntent {
    fn default() -> Self {
        Self {
            filters: MetadataFilter::default(),
            sort: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RetrievalIntent {
    /// Build an intent from raw extractor output, bounding and type-checking
    /// every field. Never fails: anything unusable falls back to its default.
    pub fn from_extraction(raw: &Value) -> Self {
        Self {
            filters: raw
                .get("filters")
                .map(MetadataFilter::from_value)
                .unwrap_or_default(),
            sort: raw.get("sort").and_then(SortOrder::from_value),
            limit: coerce_limit(raw.get("limit")),
        }
    }

    /// True when the intent needs exact chronological ordering.
    pub fn is_sorted(&self) -> bool {
        self.sort.is_some()
    }
}

fn coerce_limit(raw: Option<&Value>) -> usize {
    let parsed = match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) => n.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as usize,
        None => DEFAULT_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_limit_is_always_in_range() {
        let cases = [
            (json!(0), 1),
            (json!(-4), 1),
            (json!(37), 20),
            (json!(20), 20),
            (json!(3), 3),
            (json!(4.0), 4),
            (json!(2.5), 5),
            (json!("five"), 5),
            (json!("7"), 7),
            (json!(null), 5),
            (json!(true), 5),
        ];

        for (raw, expected) in cases {
            let intent = RetrievalIntent::from_extraction(&json!({ "limit": raw }));
            assert_eq!(intent.limit, expected, "limit {raw}");
        }

        assert_eq!(RetrievalIntent::from_extraction(&json!({})).limit, 5);
    }

    #[test]
    fn test_sort_accepts_only_asc_and_desc() {
        let sort_of = |v: Value| RetrievalIntent::from_extraction(&json!({ "sort": v })).sort;
        assert_eq!(sort_of(json!("asc")), Some(SortOrder::Asc));
        assert_eq!(sort_of(json!("desc")), Some(SortOrder::Desc));
        assert_eq!(sort_of(json!("latest")), None);
        assert_eq!(sort_of(json!("none")), None);
        assert_eq!(sort_of(json!(null)), None);
        assert_eq!(sort_of(json!(1)), None);
    }

    #[test]
    fn test_empty_filter_values_are_stripped() {
        let intent = RetrievalIntent::from_extraction(&json!({
            "filters": { "token": "", "type": null, "direction": "Incoming" },
            "sort": "desc",
            "limit": 1
        }));

        assert_eq!(
            intent,
            RetrievalIntent {
                filters: MetadataFilter {
                    token: None,
                    tx_type: None,
                    direction: Some(Direction::Incoming),
                },
                sort: Some(SortOrder::Desc),
                limit: 1,
            }
        );
    }

    #[test]
    fn test_unknown_filter_keys_and_values_dropped() {
        let intent = RetrievalIntent::from_extraction(&json!({
            "filters": { "amount": "100", "direction": "sideways", "type": "erc20_transfer" }
        }));
        assert_eq!(intent.filters.direction, None);
        assert_eq!(intent.filters.tx_type, Some(TxType::Erc20Transfer));
        assert_eq!(intent.filters.token, None);
    }

    #[test]
    fn test_non_object_extraction_yields_default() {
        assert_eq!(
            RetrievalIntent::from_extraction(&json!("garbage")),
            RetrievalIntent::default()
        );
        assert_eq!(
            RetrievalIntent::from_extraction(&json!({ "filters": ["token"] })),
            RetrievalIntent::default()
        );
    }

    #[test]
    fn test_filter_matches_token_case_insensitively() {
        let doc = TransactionDocument {
            id: "erc20_0x1_0".into(),
            text: String::new(),
            tx_type: TxType::Erc20Transfer,
            token: "USDT".into(),
            direction: Direction::Outgoing,
            timestamp: 1,
            date: String::new(),
            tx_hash: "0x1".into(),
            address: String::new(),
        };

        let filter = MetadataFilter {
            token: Some("usdt".into()),
            ..Default::default()
        };
        assert!(filter.matches(&doc));

        let filter = MetadataFilter {
            token: Some("usdt".into()),
            direction: Some(Direction::Incoming),
            ..Default::default()
        };
        assert!(!filter.matches(&doc));
        assert!(MetadataFilter::default().matches(&doc));
    }
}
