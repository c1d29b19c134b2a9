//! Neighbor selection and pruning.

use std::cmp::Reverse;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::Hnsw;
use crate::config::SearchAlgorithm;
use crate::index::hnsw::queue::{Candidate, MaxQueue, MinQueue};
use crate::index::hnsw::vertex::{Edge, EdgeSet, Vertex};

impl Hnsw {
    /// Reduces `candidates` to at most `k` using the configured policy.
    ///
    /// `exclude` keeps the vertex being linked out of heuristic extensions.
    pub(super) fn select_neighbors(
        &self,
        query: &[f32],
        candidates: MaxQueue,
        k: usize,
        level: usize,
        exclude: Option<u64>,
    ) -> MaxQueue {
        match self.config.search_algorithm() {
            SearchAlgorithm::Simple => select_simple(candidates, k),
            SearchAlgorithm::Heuristic => {
                self.select_heuristic(query, candidates, k, level, exclude)
            }
        }
    }

    /// Diversity-aware selection from the HNSW paper (algorithm 4).
    ///
    /// A candidate is accepted only if it is strictly closer to the query
    /// than to every neighbor accepted so far.
    fn select_heuristic(
        &self,
        query: &[f32],
        candidates: MaxQueue,
        k: usize,
        level: usize,
        exclude: Option<u64>,
    ) -> MaxQueue {
        let mut seen: FxHashSet<u64> = candidates.iter().map(Candidate::id).collect();
        seen.extend(exclude);

        let mut working: MinQueue = MinQueue::with_capacity(candidates.len());
        if self.config.heuristic_extend_candidates() {
            for candidate in candidates.iter() {
                let (neighbors, _) = candidate.vertex.live_neighbors(level);
                for (neighbor, _) in neighbors {
                    if seen.insert(neighbor.id()) {
                        let distance = self.distance.distance(query, neighbor.vector());
                        working.push(Reverse(Candidate::new(distance, neighbor)));
                    }
                }
            }
        }
        working.extend(candidates.into_iter().map(Reverse));

        let mut selected: Vec<Candidate> = Vec::with_capacity(k.min(working.len()));
        let mut rejected: Vec<Candidate> = Vec::new();
        while selected.len() < k {
            let Some(Reverse(candidate)) = working.pop() else {
                break;
            };
            let diverse = selected.iter().all(|accepted| {
                self.distance
                    .distance(candidate.vertex.vector(), accepted.vertex.vector())
                    > candidate.distance
            });
            if diverse {
                selected.push(candidate);
            } else {
                rejected.push(candidate);
            }
        }

        if self.config.heuristic_keep_pruned() {
            let missing = k - selected.len();
            selected.extend(rejected.into_iter().take(missing));
        }
        selected.into_iter().collect()
    }

    /// Re-runs selection over `vertex`'s live edges at `level` and replaces
    /// them with the result.
    pub(super) fn prune_neighbors(&self, vertex: &Arc<Vertex>, k: usize, level: usize) {
        let (neighbors, stale) = vertex.live_neighbors(level);
        self.counters.record_stale_neighbors(stale);

        let candidates: MaxQueue = neighbors
            .into_iter()
            .map(|(neighbor, distance)| Candidate::new(distance, neighbor))
            .collect();
        let selected = self.select_neighbors(
            vertex.vector(),
            candidates,
            k,
            level,
            Some(vertex.id()),
        );

        let edges: EdgeSet = selected
            .into_iter()
            .map(|c| (c.id(), Edge::new(&c.vertex, c.distance)))
            .collect();
        vertex.set_edges(level, edges);
        self.counters.record_prune();
    }
}

/// Drops the worst candidates until at most `k` remain.
fn select_simple(mut candidates: MaxQueue, k: usize) -> MaxQueue {
    while candidates.len() > k {
        candidates.pop();
    }
    candidates
}
