//! Core types: catalog identifiers and embeddings.

mod embedding;
mod id;

pub use embedding::Embedding;
pub use id::CatalogId;
