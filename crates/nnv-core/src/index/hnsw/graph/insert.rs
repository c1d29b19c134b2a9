//! HNSW insert operations.

use std::sync::Arc;

use tracing::debug;

use super::{Hnsw, MAX_LEVEL};
use crate::distance::normalize;
use crate::error::Result;
use crate::index::hnsw::vertex::Vertex;
use crate::metadata::Metadata;

impl Hnsw {
    /// Inserts a vertex at `level` (capped at [`MAX_LEVEL`]).
    ///
    /// Under cosine distance the vector is normalized before it is stored.
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) if the
    ///   vector length differs from [`dim`](Hnsw::dim).
    /// - [`Error::AlreadyExists`](crate::Error::AlreadyExists) if `id` is
    ///   already stored.
    pub fn insert(
        &self,
        id: u64,
        mut vector: Vec<f32>,
        metadata: Metadata,
        level: usize,
    ) -> Result<()> {
        self.check_dimension(vector.len())?;
        if self.normalizes() {
            normalize(&mut vector);
        }

        let level = level.min(MAX_LEVEL);
        let vertex = Arc::new(Vertex::new(id, vector, Arc::new(metadata), level));
        self.vertices.store(Arc::clone(&vertex))?;

        let entrypoint = loop {
            if let Some(ep) = self.entrypoint.load_full() {
                break ep;
            }
            if self.swap_entrypoint(&None, Some(Arc::clone(&vertex))) {
                debug!(id, level, "first vertex installed as entrypoint");
                return Ok(());
            }
        };

        self.link(&vertex, entrypoint)?;
        self.promote_entrypoint(&vertex);
        Ok(())
    }

    /// Connects a stored vertex to the graph below `entrypoint`.
    ///
    /// Selected neighbors are merged into the vertex's edge sets: a
    /// concurrent insert may already have linked back to it.
    pub(super) fn link(&self, vertex: &Arc<Vertex>, entrypoint: Arc<Vertex>) -> Result<()> {
        let query = vertex.vector();
        let top = entrypoint.level().min(vertex.level());

        let start = self.distance.distance(query, entrypoint.vector());
        let (mut current, _) = (vertex.level() + 1..=entrypoint.level())
            .rev()
            .fold((entrypoint, start), |(closest, distance), level| {
                self.greedy_closest(query, closest, distance, level)
            });

        for level in (0..=top).rev() {
            let ef = self.config.ef_construction();
            let mut candidates = self.search_level(query, &current, ef, level, None)?;
            candidates.retain(|c| c.id() != vertex.id());

            let selected = self
                .select_neighbors(query, candidates, self.config.m(), level, Some(vertex.id()))
                .into_sorted_vec();
            let Some(closest) = selected.first() else {
                continue;
            };
            let next = Arc::clone(&closest.vertex);

            let max_degree = self.config.max_degree(level);
            for candidate in &selected {
                vertex.add_edge(level, &candidate.vertex, candidate.distance);
            }
            if vertex.edges_count(level) > max_degree {
                self.prune_neighbors(vertex, max_degree, level);
            }

            for candidate in &selected {
                candidate.vertex.add_edge(level, vertex, candidate.distance);
                if candidate.vertex.edges_count(level) > max_degree {
                    self.prune_neighbors(&candidate.vertex, max_degree, level);
                }
            }
            current = next;
        }
        Ok(())
    }

    /// Installs `vertex` as entrypoint when it is higher than the current
    /// one, or when the current one is missing or deleted.
    ///
    /// A lost race is re-evaluated against the new entrypoint.
    fn promote_entrypoint(&self, vertex: &Arc<Vertex>) {
        loop {
            if vertex.is_deleted() {
                return;
            }
            let current = self.entrypoint.load_full();
            let replace = current
                .as_ref()
                .is_none_or(|ep| ep.is_deleted() || vertex.level() > ep.level());
            if !replace {
                return;
            }
            if self.swap_entrypoint(&current, Some(Arc::clone(vertex))) {
                debug!(id = vertex.id(), level = vertex.level(), "entrypoint promoted");
                return;
            }
        }
    }
}
