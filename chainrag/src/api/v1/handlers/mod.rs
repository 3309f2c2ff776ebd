pub mod chat;
pub(crate) mod health;
pub mod prepare;

pub use health::health_check;
