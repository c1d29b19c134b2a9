//! HNSW (Hierarchical Navigable Small World) index.
//!
//! # Module Organization
//!
//! - `vertex`: graph nodes with per-level weak adjacency
//! - `store`: sharded id to vertex maps
//! - `graph`: insert, search and remove
//! - `persistence`: binary commit/load
//! - `context`: search cancellation

mod context;
mod graph;
mod persistence;
mod queue;
mod store;
mod vertex;

pub use context::SearchContext;
pub use graph::{CounterSnapshot, Hnsw, SearchResult, MAX_LEVEL};
pub use store::VERTEX_SHARD_COUNT;
pub use vertex::Vertex;
