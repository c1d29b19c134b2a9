//! Sharded vertex storage.
//!
//! The id space is split into [`VERTEX_SHARD_COUNT`] maps, each behind its
//! own lock. Operations on different shards never contend.

use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use super::vertex::Vertex;
use crate::error::{Error, Result};

/// Number of independently locked vertex shards.
pub const VERTEX_SHARD_COUNT: usize = 16;

type Shard = RwLock<FxHashMap<u64, Arc<Vertex>>>;

#[derive(Debug)]
pub(crate) struct VertexStore {
    shards: [Shard; VERTEX_SHARD_COUNT],
    len: AtomicUsize,
    bytes: AtomicU64,
}

impl Default for VertexStore {
    fn default() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
            len: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
        }
    }
}

impl VertexStore {
    #[inline]
    pub(crate) fn shard_index(id: u64) -> usize {
        let mut hasher = FxHasher::default();
        hasher.write_u64(id);
        // Modulo keeps the value below the shard count.
        #[allow(clippy::cast_possible_truncation)]
        let index = (hasher.finish() % VERTEX_SHARD_COUNT as u64) as usize;
        index
    }

    fn shard(&self, id: u64) -> &Shard {
        &self.shards[Self::shard_index(id)]
    }

    pub(crate) fn store(&self, vertex: Arc<Vertex>) -> Result<()> {
        let id = vertex.id();
        let bytes = vertex.bytes_size();
        {
            let mut shard = self.shard(id).write();
            if shard.contains_key(&id) {
                return Err(Error::AlreadyExists(id));
            }
            shard.insert(id, vertex);
        }
        self.len.fetch_add(1, Ordering::AcqRel);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        Ok(())
    }

    /// Marks the vertex deleted and unlinks it from its shard.
    pub(crate) fn remove(&self, id: u64) -> Result<Arc<Vertex>> {
        let vertex = self
            .shard(id)
            .write()
            .remove(&id)
            .ok_or(Error::NotFound(id))?;
        vertex.mark_deleted();
        self.len.fetch_sub(1, Ordering::AcqRel);
        self.bytes.fetch_sub(vertex.bytes_size(), Ordering::Relaxed);
        Ok(vertex)
    }

    pub(crate) fn get(&self, id: u64) -> Result<Arc<Vertex>> {
        self.shard(id)
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    pub(crate) fn contains(&self, id: u64) -> bool {
        self.shard(id).read().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Copies each shard's live vertices, ordered by id within a shard.
    ///
    /// Each shard lock is held only while its map is copied.
    pub(crate) fn snapshot(&self) -> Vec<Vec<Arc<Vertex>>> {
        self.shards
            .iter()
            .map(|shard| {
                let mut vertices: Vec<Arc<Vertex>> = shard
                    .read()
                    .values()
                    .filter(|v| !v.is_deleted())
                    .cloned()
                    .collect();
                vertices.sort_unstable_by_key(|v| v.id());
                vertices
            })
            .collect()
    }

    /// Live vertex with the highest level, ties broken by lowest id.
    pub(crate) fn highest(&self) -> Option<Arc<Vertex>> {
        self.shards
            .iter()
            .filter_map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|v| !v.is_deleted())
                    .max_by(|a, b| a.level().cmp(&b.level()).then(b.id().cmp(&a.id())))
                    .cloned()
            })
            .max_by(|a, b| a.level().cmp(&b.level()).then(b.id().cmp(&a.id())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;

    fn vertex(id: u64, level: usize) -> Arc<Vertex> {
        Arc::new(Vertex::new(id, vec![0.0; 2], Arc::new(Metadata::new()), level))
    }

    #[test]
    fn test_store_and_get() {
        let store = VertexStore::default();
        store.store(vertex(7, 0)).unwrap();
        assert_eq!(store.get(7).unwrap().id(), 7);
        assert!(store.contains(7));
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes(), 8 + 8);
    }

    #[test]
    fn test_store_duplicate() {
        let store = VertexStore::default();
        store.store(vertex(7, 0)).unwrap();
        let err = store.store(vertex(7, 1)).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(7)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_marks_deleted() {
        let store = VertexStore::default();
        store.store(vertex(3, 0)).unwrap();
        let removed = store.remove(3).unwrap();
        assert!(removed.is_deleted());
        assert!(!store.contains(3));
        assert_eq!(store.len(), 0);
        assert_eq!(store.bytes(), 0);
        assert!(matches!(store.remove(3), Err(Error::NotFound(3))));
        assert!(matches!(store.get(3), Err(Error::NotFound(3))));
    }

    #[test]
    fn test_shard_index_in_range_and_spread() {
        let mut used = [false; VERTEX_SHARD_COUNT];
        for id in 0..1000u64 {
            let index = VertexStore::shard_index(id);
            assert!(index < VERTEX_SHARD_COUNT);
            used[index] = true;
        }
        assert!(used.iter().filter(|u| **u).count() > VERTEX_SHARD_COUNT / 2);
    }

    #[test]
    fn test_snapshot_sorted_per_shard() {
        let store = VertexStore::default();
        for id in (0..100u64).rev() {
            store.store(vertex(id, 0)).unwrap();
        }
        let shards = store.snapshot();
        assert_eq!(shards.len(), VERTEX_SHARD_COUNT);
        assert_eq!(shards.iter().map(Vec::len).sum::<usize>(), 100);
        for shard in &shards {
            assert!(shard.windows(2).all(|w| w[0].id() < w[1].id()));
        }
    }

    #[test]
    fn test_highest() {
        let store = VertexStore::default();
        assert!(store.highest().is_none());
        store.store(vertex(1, 0)).unwrap();
        store.store(vertex(2, 3)).unwrap();
        store.store(vertex(3, 3)).unwrap();
        store.store(vertex(4, 1)).unwrap();
        assert_eq!(store.highest().unwrap().id(), 2);
    }
}
