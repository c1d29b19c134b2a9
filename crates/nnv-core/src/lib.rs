//! # `nnv-core`
//!
//! In-memory approximate nearest neighbor index built on a Hierarchical
//! Navigable Small World (HNSW) graph, with a binary snapshot codec.
//!
//! ## Features
//!
//! - **Concurrent**: insert, search and remove from many threads; vertex
//!   storage is split into independently locked shards and the entrypoint
//!   is swapped atomically
//! - **3 Distance Metrics**: Cosine, Euclidean (squared), Manhattan
//! - **2 Selection Policies**: Simple top-M and the diversity heuristic
//! - **Snapshots**: deterministic big-endian commit/load of the full graph
//! - **Quantization**: float16, bfloat16 and 8-bit codecs for sibling stores
//!
//! ## Quick Start
//!
//! ```rust
//! use nnv_core::{DistanceMetric, Hnsw, HnswOptions, Metadata, SearchContext};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let graph = Hnsw::new(3, DistanceMetric::Euclidean, HnswOptions::default())?;
//!
//!     for id in 0..10u64 {
//!         let level = graph.random_level();
//!         graph.insert(id, vec![id as f32, 0.0, 1.0], Metadata::new(), level)?;
//!     }
//!
//!     let results = graph.search(&SearchContext::new(), &[4.0, 0.0, 1.0], 3)?;
//!     assert_eq!(results[0].id, 4);
//!
//!     let mut snapshot = Vec::new();
//!     graph.commit(&mut snapshot, true)?;
//!     let restored = Hnsw::from_reader(snapshot.as_slice())?;
//!     assert_eq!(restored.len(), 10);
//!     # Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::doc_markdown,
        clippy::uninlined_format_args,
        clippy::cast_lossless,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::float_cmp
    )
)]

pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod metadata;
pub mod quantization;
mod wire;

pub use config::{ConfigError, HnswConfig, HnswOptions, SearchAlgorithm};
pub use distance::{CpuDistance, DistanceEngine, DistanceMetric};
pub use error::{Error, Result};
pub use index::hnsw::{
    CounterSnapshot, Hnsw, SearchContext, SearchResult, Vertex, MAX_LEVEL, VERTEX_SHARD_COUNT,
};
pub use metadata::Metadata;
pub use quantization::{
    BFloat16Quantization, Float16Quantization, Float8Quantization, Float8Vector,
    NoQuantization, Quantization, QuantizationKind,
};
