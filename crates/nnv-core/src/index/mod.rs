//! Vector indexes.

pub mod hnsw;
