//! v1 API Data Transfer Objects.
//!
//! Wire types for the v1 REST API, kept separate from the domain models in
//! `src/models/`.

pub mod chat;
pub mod common;
pub mod prepare;

pub use chat::*;
pub use common::*;
pub use prepare::*;
