//! Distance-ordered candidates for the beam search heaps.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use super::vertex::Vertex;

/// A vertex paired with its distance to the current query.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) distance: f32,
    pub(crate) vertex: Arc<Vertex>,
}

impl Candidate {
    pub(crate) fn new(distance: f32, vertex: Arc<Vertex>) -> Self {
        Self { distance, vertex }
    }

    pub(crate) fn id(&self) -> u64 {
        self.vertex.id()
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Total order on distance, ties broken by id so heaps are deterministic.
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id().cmp(&other.id()))
    }
}

/// Worst candidate on top.
pub(crate) type MaxQueue = BinaryHeap<Candidate>;

/// Closest candidate on top.
pub(crate) type MinQueue = BinaryHeap<Reverse<Candidate>>;
