pub mod api;
pub mod builder;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod jobs;
pub mod llm;
pub mod models;
pub mod retrieval;
pub mod services;
pub mod tag;
