//! HNSW Graph Structure
//!
//! Implements the hierarchical navigable small world graph as described in
//! the Malkov & Yashunin paper, over a sharded vertex store with a
//! lock-free entrypoint.
//!
//! # Module Organization
//!
//! - `insert`: vertex insertion, greedy descent and per-level linking
//! - `search`: k-NN search and the per-level beam search
//! - `neighbors`: Simple and Heuristic neighbor selection, pruning
//! - `remove`: soft-delete with entrypoint and neighbor repair
//! - `counters`: per-graph observability counters

mod counters;
mod insert;
mod neighbors;
mod remove;
mod search;

pub use counters::CounterSnapshot;
pub use search::SearchResult;

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use rand::Rng;

use self::counters::GraphCounters;
use super::store::VertexStore;
use super::vertex::{Edge, Vertex};
use crate::config::{HnswConfig, HnswOptions};
use crate::distance::{CpuDistance, DistanceEngine, DistanceMetric};
use crate::error::{Error, Result};

/// Highest level a vertex may occupy.
pub const MAX_LEVEL: usize = 16;

/// Levels assumed for the memory estimate of an empty graph.
const DEFAULT_ESTIMATE_LEVELS: usize = 10;

/// Concurrent HNSW index.
///
/// All operations take `&self` and may run from many threads at once,
/// except [`load`](Hnsw::load) which replaces the whole graph.
pub struct Hnsw {
    pub(super) dim: usize,
    pub(super) distance: Arc<dyn DistanceEngine>,
    pub(super) config: HnswConfig,
    pub(super) vertices: VertexStore,
    /// Top-level search origin, swapped atomically and never locked.
    pub(super) entrypoint: ArcSwapOption<Vertex>,
    pub(super) counters: GraphCounters,
}

impl Hnsw {
    /// Creates an empty graph from unvalidated options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the options fail validation.
    pub fn new(dim: usize, metric: DistanceMetric, options: HnswOptions) -> Result<Self> {
        Ok(Self::with_config(dim, metric, options.build()?))
    }

    /// Creates an empty graph with the built-in CPU distance for `metric`.
    #[must_use]
    pub fn with_config(dim: usize, metric: DistanceMetric, config: HnswConfig) -> Self {
        Self::with_engine(dim, Arc::new(CpuDistance::new(metric)), config)
    }

    /// Creates an empty graph measured by a caller-provided engine.
    #[must_use]
    pub fn with_engine(dim: usize, distance: Arc<dyn DistanceEngine>, config: HnswConfig) -> Self {
        Self {
            dim,
            distance,
            config,
            vertices: VertexStore::default(),
            entrypoint: ArcSwapOption::empty(),
            counters: GraphCounters::default(),
        }
    }

    /// Number of live vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the graph holds no live vertex.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Distance kind name, e.g. `"cosine"`.
    #[must_use]
    pub fn distance(&self) -> &'static str {
        self.distance.kind()
    }

    /// Distance metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.distance.metric()
    }

    /// Immutable tuning parameters.
    #[must_use]
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Stored vector for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is absent or removed.
    pub fn get(&self, id: u64) -> Result<Vec<f32>> {
        Ok(self.vertices.get(id)?.vector().to_vec())
    }

    /// Vertex handle for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is absent or removed.
    pub fn get_vertex(&self, id: u64) -> Result<Arc<Vertex>> {
        self.vertices.get(id)
    }

    /// Whether `id` is a live vertex.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.vertices.contains(id)
    }

    /// Id of the current entrypoint.
    #[must_use]
    pub fn entrypoint_id(&self) -> Option<u64> {
        self.entrypoint.load_full().map(|ep| ep.id())
    }

    /// Draws an insertion level from the thread-local RNG.
    #[must_use]
    pub fn random_level(&self) -> usize {
        self.random_level_with(&mut rand::thread_rng())
    }

    /// Draws `floor(-ln(U) * level_multiplier)` with `U` uniform in (0, 1],
    /// capped at [`MAX_LEVEL`].
    pub fn random_level_with<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let uniform = 1.0 - rng.gen::<f64>();
        let level = (-uniform.ln() * f64::from(self.config.level_multiplier())).floor();
        // Non-negative and capped before the cast.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = level.min(MAX_LEVEL as f64) as usize;
        level
    }

    /// Estimated memory footprint: expected edge slots per vertex plus
    /// vector and metadata payload.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bytes_size(&self) -> u64 {
        let edge_bytes = std::mem::size_of::<(u64, Edge)>() as f64;
        let lock_bytes = std::mem::size_of::<parking_lot::RwLock<super::vertex::EdgeSet>>() as f64;
        let levels = self
            .entrypoint
            .load_full()
            .map_or(DEFAULT_ESTIMATE_LEVELS, |ep| ep.level() + 1);
        let multiplier = f64::from(self.config.level_multiplier());

        let mut per_vertex = self.config.m_max0() as f64 * edge_bytes + lock_bytes;
        for level in 1..levels {
            let reach = (-(level as f64) / multiplier).exp();
            per_vertex += (self.config.m_max() as f64 * edge_bytes + lock_bytes) * reach;
        }

        // Estimate only; truncation is fine.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let edges = (per_vertex * self.len() as f64) as u64;
        edges + self.vertices.bytes()
    }

    /// Snapshot of this graph's counters.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    pub(super) fn check_dimension(&self, len: usize) -> Result<()> {
        if len == self.dim {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: len,
            })
        }
    }

    pub(super) fn normalizes(&self) -> bool {
        self.distance.metric().needs_normalization()
    }

    /// Compare-and-swap on the entrypoint. Returns whether `new` was installed.
    pub(super) fn swap_entrypoint(
        &self,
        current: &Option<Arc<Vertex>>,
        new: Option<Arc<Vertex>>,
    ) -> bool {
        let previous = self.entrypoint.compare_and_swap(current, new);
        let won = match (&*previous, current) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !won {
            self.counters.record_cas_lost();
        }
        won
    }
}

impl fmt::Display for Hnsw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HNSW(dim: {}, distance: {}, config={{{}}})",
            self.dim,
            self.distance(),
            self.config
        )
    }
}

impl fmt::Debug for Hnsw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hnsw")
            .field("dim", &self.dim)
            .field("distance", &self.distance())
            .field("config", &self.config)
            .field("len", &self.len())
            .field("entrypoint", &self.entrypoint_id())
            .finish_non_exhaustive()
    }
}
