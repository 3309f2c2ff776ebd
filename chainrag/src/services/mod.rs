mod chat;

pub use chat::{ChatAnswer, ChatService, NO_MATCHES_MESSAGE};
