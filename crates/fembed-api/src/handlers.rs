//! Request handlers.

pub mod embedding;
pub mod health;

pub use embedding::{batch_extract, extract_embedding};
pub use health::{health, models, stats};
