//! Document store builders.
//!
//! A builder turns an account into a persisted, tag-addressed vector index in
//! two sequential stages. The stages are internal to the builder; the
//! preparation job reports them through its own public states.

mod documents;
mod etherscan;

use async_trait::async_trait;

use crate::error::Result;
use crate::tag::Tag;

pub use documents::{convert_to_documents, parse_jsonl, to_jsonl, EtherscanTx};
pub use etherscan::{EtherscanClient, EtherscanStoreBuilder};

#[async_trait]
pub trait DocumentStoreBuilder: Send + Sync {
    /// Fetch the account's transactions and persist them as documents for
    /// `tag`. Returns the number of documents written.
    async fn fetch(&self, tag: &Tag, account: &str) -> Result<usize>;

    /// Embed the documents fetched for `tag` and persist the index. Returns
    /// the number of indexed documents.
    async fn index(&self, tag: &Tag) -> Result<usize>;
}
