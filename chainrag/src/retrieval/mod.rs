mod executor;
mod intent_cache;
mod planner;

pub use executor::{execute_plan, RetrievalOutcome, Retriever};
pub use intent_cache::IntentCache;
pub use planner::QueryPlanner;
