//! Account tag normalization.
//!
//! A [`Tag`] is the only key used to address per-account state: raw and
//! processed transaction files, the persisted vector index, the index cache
//! and the preparation job registry. Both the preparation path and the query
//! path build tags through [`Tag::normalize`], so an address typed in either
//! place resolves to byte-identical keys.

use std::fmt;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("static regex"))
}

fn dash_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-{2,}").expect("static regex"))
}

/// Filesystem-safe, lower-case key derived from an account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Normalize a raw account identifier into a tag.
    ///
    /// Every run of characters outside `[a-zA-Z0-9_-]` becomes a single `-`,
    /// consecutive dashes collapse, leading and trailing dashes are trimmed
    /// and the result is lower-cased. An input with nothing left after
    /// cleaning falls back to a `run-YYYYMMDD-HHMMSS` tag so the result is
    /// never empty.
    pub fn normalize(raw: &str) -> Self {
        let replaced = disallowed_chars().replace_all(raw, "-");
        let collapsed = dash_runs().replace_all(&replaced, "-");
        let cleaned = collapsed.trim_matches('-').to_ascii_lowercase();

        if cleaned.is_empty() {
            return Self(Utc::now().format("run-%Y%m%d-%H%M%S").to_string());
        }

        Self(cleaned)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
