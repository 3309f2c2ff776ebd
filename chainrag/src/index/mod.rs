mod cache;
mod store;
mod vector;

pub use cache::IndexCache;
pub use store::IndexStore;
pub use vector::{IndexedDocument, ScoredDocument, VectorIndex};
