//! HNSW search operations.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::Hnsw;
use crate::distance::normalize;
use crate::error::Result;
use crate::index::hnsw::context::SearchContext;
use crate::index::hnsw::queue::{Candidate, MaxQueue, MinQueue};
use crate::index::hnsw::vertex::Vertex;
use crate::metadata::Metadata;

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Vertex id.
    pub id: u64,
    /// Metadata attached at insertion.
    pub metadata: Arc<Metadata>,
    /// Raw distance to the query (lower is closer).
    pub score: f32,
}

impl Hnsw {
    /// Returns up to `k` nearest live vertices, closest first.
    ///
    /// An empty graph yields an empty result.
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) if the
    ///   query length differs from [`dim`](Hnsw::dim).
    /// - [`Error::Cancelled`](crate::Error::Cancelled) or
    ///   [`Error::DeadlineExceeded`](crate::Error::DeadlineExceeded) when
    ///   `ctx` fires before the beam search completes.
    pub fn search(
        &self,
        ctx: &SearchContext,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.check_dimension(query.len())?;
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(entrypoint) = self.entrypoint.load_full() else {
            return Ok(Vec::new());
        };

        let query: Cow<'_, [f32]> = if self.normalizes() {
            let mut owned = query.to_vec();
            normalize(&mut owned);
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(query)
        };

        if let Err(e) = ctx.check() {
            self.counters.record_cancelled();
            return Err(e);
        }

        let start = self.distance.distance(&query, entrypoint.vector());
        let (current, _) = (1..=entrypoint.level())
            .rev()
            .fold((entrypoint, start), |(closest, distance), level| {
                self.greedy_closest(&query, closest, distance, level)
            });

        let ef = self.config.ef().max(k);
        let candidates = self
            .search_level(&query, &current, ef, 0, Some(ctx))
            .inspect_err(|_| self.counters.record_cancelled())?;

        let selected = self.select_neighbors(&query, candidates, k, 0, None);
        Ok(selected
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchResult {
                id: c.id(),
                metadata: Arc::clone(c.vertex.metadata()),
                score: c.distance,
            })
            .collect())
    }

    /// Moves to strictly closer neighbors at `level` until none improves.
    pub(super) fn greedy_closest(
        &self,
        query: &[f32],
        start: Arc<Vertex>,
        mut min_distance: f32,
        level: usize,
    ) -> (Arc<Vertex>, f32) {
        let mut current = start;
        loop {
            let (neighbors, stale) = current.live_neighbors(level);
            self.counters.record_stale_neighbors(stale);

            let mut closest = None;
            for (neighbor, _) in neighbors {
                let distance = self.distance.distance(query, neighbor.vector());
                if distance < min_distance {
                    min_distance = distance;
                    closest = Some(neighbor);
                }
            }
            match closest {
                Some(next) => current = next,
                None => return (current, min_distance),
            }
        }
    }

    /// Beam search at one level, returning at most `ef` results worst-first.
    ///
    /// A deleted `entry` still seeds the frontier but never enters the results.
    pub(super) fn search_level(
        &self,
        query: &[f32],
        entry: &Arc<Vertex>,
        ef: usize,
        level: usize,
        ctx: Option<&SearchContext>,
    ) -> Result<MaxQueue> {
        let ef = ef.max(1);
        let seed = Candidate::new(
            self.distance.distance(query, entry.vector()),
            Arc::clone(entry),
        );

        let mut visited = FxHashSet::default();
        visited.insert(entry.id());
        let mut results = MaxQueue::with_capacity(ef.min(self.len()).saturating_add(1));
        if !entry.is_deleted() {
            results.push(seed.clone());
        }
        let mut candidates = MinQueue::new();
        candidates.push(Reverse(seed));

        while let Some(Reverse(candidate)) = candidates.pop() {
            if let Some(ctx) = ctx {
                ctx.check()?;
            }
            if let Some(worst) = results.peek() {
                if candidate.distance > worst.distance && results.len() >= ef {
                    break;
                }
            }

            let (neighbors, stale) = candidate.vertex.live_neighbors(level);
            self.counters.record_stale_neighbors(stale);

            for (neighbor, _) in neighbors {
                if !visited.insert(neighbor.id()) {
                    continue;
                }
                let distance = self.distance.distance(query, neighbor.vector());
                let improves = results
                    .peek()
                    .is_none_or(|worst| distance < worst.distance);
                if improves || results.len() < ef {
                    let next = Candidate::new(distance, neighbor);
                    candidates.push(Reverse(next.clone()));
                    results.push(next);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }
        Ok(results)
    }
}
