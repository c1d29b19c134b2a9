//! HNSW remove operations.

use std::sync::Arc;

use tracing::{debug, warn};

use super::Hnsw;
use crate::error::Result;
use crate::index::hnsw::vertex::Vertex;

impl Hnsw {
    /// Soft-deletes `id` and repairs its neighbors.
    ///
    /// Edges pointing at the removed vertex from vertices it did not link
    /// back to are left in place and skipped by traversal until a prune
    /// rewrites them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if `id` is absent
    /// or already removed.
    pub fn remove(&self, id: u64) -> Result<()> {
        let vertex = self.vertices.remove(id)?;

        let current = self.entrypoint.load_full();
        if current.as_ref().is_some_and(|ep| Arc::ptr_eq(ep, &vertex)) {
            let replacement = self.replacement_entrypoint(&vertex);
            let replacement_id = replacement.as_ref().map(|v| v.id());
            if self.swap_entrypoint(&current, replacement) {
                debug!(removed = id, entrypoint = ?replacement_id, "entrypoint repaired");
            } else {
                warn!(removed = id, "entrypoint changed during repair");
            }
        }

        for level in (0..=vertex.level()).rev() {
            let max_degree = self.config.max_degree(level);
            let (neighbors, _) = vertex.live_neighbors(level);
            for (neighbor, _) in neighbors {
                neighbor.remove_edge(level, id);
                self.prune_neighbors(&neighbor, max_degree, level);
            }
        }
        Ok(())
    }

    /// Closest live neighbor of `removed`, scanning from its top level down.
    ///
    /// Falls back to the highest stored vertex when the removed vertex had
    /// no live neighbor left, so a non-empty graph keeps an entrypoint.
    fn replacement_entrypoint(&self, removed: &Vertex) -> Option<Arc<Vertex>> {
        for level in (0..=removed.level()).rev() {
            let (neighbors, _) = removed.live_neighbors(level);
            let closest = neighbors
                .into_iter()
                .min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id().cmp(&b.id())));
            if let Some((neighbor, _)) = closest {
                return Some(neighbor);
            }
        }
        self.vertices.highest()
    }
}
