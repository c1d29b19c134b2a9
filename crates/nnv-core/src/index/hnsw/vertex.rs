//! Graph vertices and their per-level adjacency.
//!
//! Edges hold [`Weak`] references so the graph never forms reference
//! cycles. A neighbor whose last strong reference is gone is treated
//! exactly like a soft-deleted one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::metadata::{self, Metadata};

/// Weighted link to a neighbor at one level.
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub(crate) vertex: Weak<Vertex>,
    pub(crate) distance: f32,
}

impl Edge {
    pub(crate) fn new(vertex: &Arc<Vertex>, distance: f32) -> Self {
        Self {
            vertex: Arc::downgrade(vertex),
            distance,
        }
    }
}

/// Neighbor id to edge, for one level of one vertex.
pub(crate) type EdgeSet = FxHashMap<u64, Edge>;

/// A graph node.
///
/// The vector, level and metadata are immutable once the vertex is
/// constructed. Only the per-level edge sets and the deleted flag change.
#[derive(Debug)]
pub struct Vertex {
    id: u64,
    vector: Vec<f32>,
    level: usize,
    metadata: Arc<Metadata>,
    deleted: AtomicBool,
    edges: Vec<RwLock<EdgeSet>>,
}

impl Vertex {
    pub(crate) fn new(id: u64, vector: Vec<f32>, metadata: Arc<Metadata>, level: usize) -> Self {
        let edges = (0..=level).map(|_| RwLock::new(EdgeSet::default())).collect();
        Self {
            id,
            vector,
            level,
            metadata,
            deleted: AtomicBool::new(false),
            edges,
        }
    }

    /// Vertex id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stored vector (unit-normalized under cosine distance).
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Highest level this vertex participates in.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Metadata attached at insertion.
    #[must_use]
    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// Whether the vertex has been removed from the graph.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    /// Live neighbors at `level` with their cached distances, ordered by id.
    #[must_use]
    pub fn neighbors(&self, level: usize) -> Vec<(u64, f32)> {
        let (mut live, _) = self.live_neighbors(level);
        live.sort_unstable_by_key(|(neighbor, _)| neighbor.id);
        live.into_iter()
            .map(|(neighbor, distance)| (neighbor.id, distance))
            .collect()
    }

    /// Approximate payload size: id, vector and metadata.
    #[must_use]
    pub fn bytes_size(&self) -> u64 {
        8 + 4 * self.vector.len() as u64 + metadata::estimate_size(&self.metadata)
    }

    /// Upgrades the edge set at `level`, skipping deleted or reclaimed
    /// neighbors. Returns the live neighbors and how many were skipped.
    ///
    /// The level lock is held only while copying.
    pub(crate) fn live_neighbors(&self, level: usize) -> (Vec<(Arc<Vertex>, f32)>, usize) {
        let Some(edges) = self.edges.get(level) else {
            return (Vec::new(), 0);
        };
        let edges = edges.read();
        let mut live = Vec::with_capacity(edges.len());
        let mut stale = 0;
        for edge in edges.values() {
            match edge.vertex.upgrade() {
                Some(neighbor) if !neighbor.is_deleted() => live.push((neighbor, edge.distance)),
                _ => stale += 1,
            }
        }
        (live, stale)
    }

    pub(crate) fn edges_count(&self, level: usize) -> usize {
        self.edges.get(level).map_or(0, |edges| edges.read().len())
    }

    pub(crate) fn add_edge(&self, level: usize, neighbor: &Arc<Vertex>, distance: f32) {
        debug_assert!(level <= self.level, "edge above vertex level");
        if let Some(edges) = self.edges.get(level) {
            edges.write().insert(neighbor.id, Edge::new(neighbor, distance));
        }
    }

    pub(crate) fn remove_edge(&self, level: usize, neighbor_id: u64) {
        if let Some(edges) = self.edges.get(level) {
            edges.write().remove(&neighbor_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn has_edge(&self, level: usize, neighbor_id: u64) -> bool {
        self.edges
            .get(level)
            .is_some_and(|edges| edges.read().contains_key(&neighbor_id))
    }

    /// Replaces the whole edge set at `level`.
    pub(crate) fn set_edges(&self, level: usize, new_edges: EdgeSet) {
        if let Some(edges) = self.edges.get(level) {
            *edges.write() = new_edges;
        }
    }
}
