mod document;
mod intent;
mod job;

pub use document::*;
pub use intent::*;
pub use job::*;
