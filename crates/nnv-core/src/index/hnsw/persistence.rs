//! Binary snapshot codec for [`Hnsw`] graphs.
//!
//! # Stream Format
//!
//! All integers and floats are big-endian.
//!
//! ```text
//! header (optional):
//!   [algorithm: u8] [level multiplier: f32] [ef: u32] [ef construction: u32]
//!   [m: u32] [m max: u32] [m max0: u32] [extend: u8] [keep pruned: u8]
//!   [dim: u32] [distance tag: u8]
//! body (absent for an empty graph):
//!   [entrypoint id: u64]
//!   per shard:  [count: u32] ([id: u64] [level: i32] [dim x f32] [metadata])*
//!   per vertex: [id: u64] (per level, top down: [count: u32] ([neighbor: u64] [distance: f32])*)
//! ```
//!
//! Omitting the header lets several graphs share one stream; the reader
//! must then already know the dimension.

use std::io::{BufWriter, Read, Write};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use super::graph::{Hnsw, MAX_LEVEL};
use super::store::{VertexStore, VERTEX_SHARD_COUNT};
use super::vertex::{Edge, EdgeSet, Vertex};
use crate::config::{HnswConfig, HnswOptions, SearchAlgorithm};
use crate::distance::{CpuDistance, DistanceMetric};
use crate::error::{Error, Result};
use crate::metadata;
use crate::wire;

impl Hnsw {
    /// Writes the live graph to `writer`.
    ///
    /// Vertices are snapshotted shard by shard, so vertices inserted during
    /// the commit may or may not be included, and edges only reference
    /// vertices written in the same commit.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] on write failures.
    /// - [`Error::Metadata`] if a metadata map exceeds the payload limits.
    /// - [`Error::NoEntrypoint`] if live vertices exist without an entrypoint.
    pub fn commit<W: Write>(&self, writer: W, include_header: bool) -> Result<()> {
        let mut w = BufWriter::new(writer);
        if include_header {
            write_config(&mut w, &self.config)?;
            wire::write_u32(&mut w, wire::to_u32(self.dim, "dimension")?)?;
            wire::write_u8(&mut w, self.metric().tag())?;
        }

        let shards = self.vertices.snapshot();
        let ids: FxHashSet<u64> = shards.iter().flatten().map(|v| v.id()).collect();
        if ids.is_empty() {
            w.flush()?;
            debug!("committed empty graph");
            return Ok(());
        }

        let entrypoint = self.entrypoint.load_full().ok_or(Error::NoEntrypoint)?;
        let entrypoint_id = if ids.contains(&entrypoint.id()) {
            entrypoint.id()
        } else {
            // Removed after the snapshot was taken; any written vertex is a valid origin.
            let fallback = shards
                .iter()
                .flatten()
                .max_by(|a, b| a.level().cmp(&b.level()).then(b.id().cmp(&a.id())))
                .map_or(entrypoint.id(), |v| v.id());
            warn!(
                stale = entrypoint.id(),
                fallback, "entrypoint not in snapshot, writing fallback"
            );
            fallback
        };
        wire::write_u64(&mut w, entrypoint_id)?;

        for shard in &shards {
            wire::write_u32(&mut w, wire::to_u32(shard.len(), "shard length")?)?;
            for vertex in shard {
                write_vertex(&mut w, vertex)?;
            }
        }

        for vertex in shards.iter().flatten() {
            wire::write_u64(&mut w, vertex.id())?;
            for level in (0..=vertex.level()).rev() {
                let edges: Vec<(u64, f32)> = vertex
                    .neighbors(level)
                    .into_iter()
                    .filter(|(id, _)| ids.contains(id))
                    .collect();
                wire::write_u32(&mut w, wire::to_u32(edges.len(), "edge count")?)?;
                for (id, distance) in edges {
                    wire::write_u64(&mut w, id)?;
                    wire::write_f32(&mut w, distance)?;
                }
            }
        }

        w.flush()?;
        info!(vertices = ids.len(), dim = self.dim, "graph committed");
        Ok(())
    }

    /// Replaces this graph with one read from `reader`.
    ///
    /// The stream is decoded into fresh structures; on any error the graph
    /// is left untouched. Without a header the current dimension, metric
    /// and configuration are kept.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] on read failures or a truncated stream.
    /// - [`Error::InvalidDistanceKind`] for an unknown distance tag.
    /// - [`Error::CorruptData`] for structurally inconsistent data.
    pub fn load<R: Read>(&mut self, mut reader: R, include_header: bool) -> Result<()> {
        let (config, dim, metric) = if include_header {
            let config = read_config(&mut reader)?;
            let dim = usize::try_from(wire::read_u32(&mut reader)?)
                .map_err(|_| Error::CorruptData("dimension overflows usize".to_string()))?;
            let tag = wire::read_u8(&mut reader)?;
            let metric = DistanceMetric::from_tag(tag).ok_or(Error::InvalidDistanceKind(tag))?;
            (config, dim, metric)
        } else {
            (self.config, self.dim, self.metric())
        };

        let (vertices, entrypoint) = read_body(&mut reader, dim)?;

        self.config = config;
        self.dim = dim;
        if metric != self.metric() {
            self.distance = Arc::new(CpuDistance::new(metric));
        }
        self.vertices = vertices;
        self.entrypoint = ArcSwapOption::new(entrypoint);
        info!(
            vertices = self.len(),
            dim,
            distance = metric.as_str(),
            "graph loaded"
        );
        Ok(())
    }

    /// Decodes a graph from a stream that starts with a header.
    ///
    /// # Errors
    ///
    /// See [`load`](Hnsw::load).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut graph = Self::with_config(0, DistanceMetric::Euclidean, HnswConfig::default());
        graph.load(reader, true)?;
        Ok(graph)
    }
}

fn write_config<W: Write>(w: &mut W, config: &HnswConfig) -> Result<()> {
    wire::write_u8(w, config.search_algorithm().tag())?;
    wire::write_f32(w, config.level_multiplier())?;
    wire::write_u32(w, wire::to_u32(config.ef(), "ef")?)?;
    wire::write_u32(
        w,
        wire::to_u32(config.ef_construction(), "ef_construction")?,
    )?;
    wire::write_u32(w, wire::to_u32(config.m(), "m")?)?;
    wire::write_u32(w, wire::to_u32(config.m_max(), "m_max")?)?;
    wire::write_u32(w, wire::to_u32(config.m_max0(), "m_max0")?)?;
    wire::write_u8(w, u8::from(config.heuristic_extend_candidates()))?;
    wire::write_u8(w, u8::from(config.heuristic_keep_pruned()))?;
    Ok(())
}

fn read_config<R: Read>(r: &mut R) -> Result<HnswConfig> {
    let tag = wire::read_u8(r)?;
    let search_algorithm = SearchAlgorithm::from_tag(tag)
        .ok_or_else(|| Error::CorruptData(format!("unknown search algorithm tag {tag}")))?;
    let level_multiplier = wire::read_f32(r)?;
    let ef = read_count(r)?;
    let ef_construction = read_count(r)?;
    let m = read_count(r)?;
    let m_max = read_count(r)?;
    let m_max0 = read_count(r)?;
    let extend = read_flag(r)?;
    let keep_pruned = read_flag(r)?;

    HnswOptions {
        search_algorithm,
        ef,
        ef_construction,
        m,
        m_max: Some(m_max),
        m_max0: Some(m_max0),
        level_multiplier: Some(level_multiplier),
        heuristic_extend_candidates: extend,
        heuristic_keep_pruned: keep_pruned,
    }
    .build()
    .map_err(|e| Error::CorruptData(format!("config block: {e}")))
}

fn read_count<R: Read>(r: &mut R) -> Result<usize> {
    usize::try_from(wire::read_u32(r)?)
        .map_err(|_| Error::CorruptData("count overflows usize".to_string()))
}

fn read_flag<R: Read>(r: &mut R) -> Result<bool> {
    match wire::read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::CorruptData(format!("invalid flag byte {other}"))),
    }
}

fn write_vertex<W: Write>(w: &mut W, vertex: &Vertex) -> Result<()> {
    wire::write_u64(w, vertex.id())?;
    let level = i32::try_from(vertex.level())
        .map_err(|_| Error::CorruptData(format!("level {} overflows i32", vertex.level())))?;
    wire::write_i32(w, level)?;
    for &x in vertex.vector() {
        wire::write_f32(w, x)?;
    }
    metadata::encode(w, vertex.metadata())
}

fn read_vertex<R: Read>(r: &mut R, dim: usize) -> Result<Vertex> {
    let id = wire::read_u64(r)?;
    let raw_level = wire::read_i32(r)?;
    let level = usize::try_from(raw_level)
        .ok()
        .filter(|level| *level <= MAX_LEVEL)
        .ok_or_else(|| {
            Error::CorruptData(format!("vertex {id} has invalid level {raw_level}"))
        })?;
    let vector = (0..dim)
        .map(|_| wire::read_f32(r))
        .collect::<std::io::Result<Vec<f32>>>()?;
    let metadata = metadata::decode(r)?;
    Ok(Vertex::new(id, vector, Arc::new(metadata), level))
}

fn read_body<R: Read>(r: &mut R, dim: usize) -> Result<(VertexStore, Option<Arc<Vertex>>)> {
    let vertices = VertexStore::default();
    let Some(entrypoint_id) = wire::read_u64_or_eof(r)? else {
        return Ok((vertices, None));
    };

    let mut total = 0usize;
    for _ in 0..VERTEX_SHARD_COUNT {
        let count = wire::read_u32(r)?;
        for _ in 0..count {
            let vertex = Arc::new(read_vertex(r, dim)?);
            let id = vertex.id();
            vertices.store(vertex).map_err(|_| {
                Error::CorruptData(format!("vertex {id} appears more than once"))
            })?;
            total += 1;
        }
    }

    let entrypoint = vertices.get(entrypoint_id).map_err(|_| {
        Error::CorruptData(format!("entrypoint {entrypoint_id} is not a stored vertex"))
    })?;

    let mut linked = FxHashSet::default();
    for _ in 0..total {
        let id = wire::read_u64(r)?;
        let vertex = vertices
            .get(id)
            .map_err(|_| Error::CorruptData(format!("edges for unknown vertex {id}")))?;
        if !linked.insert(id) {
            return Err(Error::CorruptData(format!("edges for vertex {id} appear twice")));
        }
        for level in (0..=vertex.level()).rev() {
            let count = wire::read_u32(r)?;
            let mut edges = EdgeSet::default();
            for _ in 0..count {
                let neighbor_id = wire::read_u64(r)?;
                let distance = wire::read_f32(r)?;
                if neighbor_id == id {
                    return Err(Error::CorruptData(format!("vertex {id} links to itself")));
                }
                let neighbor = vertices.get(neighbor_id).map_err(|_| {
                    Error::CorruptData(format!("vertex {id} links to unknown vertex {neighbor_id}"))
                })?;
                edges.insert(neighbor_id, Edge::new(&neighbor, distance));
            }
            vertex.set_edges(level, edges);
        }
    }

    Ok((vertices, Some(entrypoint)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HnswOptions;
    use crate::metadata::Metadata;
    use serde_json::json;

    fn graph(metric: DistanceMetric) -> Hnsw {
        Hnsw::new(2, metric, HnswOptions::default().with_m(4)).unwrap()
    }

    fn filled(metric: DistanceMetric) -> Hnsw {
        let g = graph(metric);
        for id in 0..20u64 {
            let mut metadata = Metadata::new();
            metadata.insert("id".to_string(), json!(id.to_string()));
            #[allow(clippy::cast_precision_loss)]
            let vector = vec![id as f32, (id % 3) as f32 + 1.0];
            g.insert(id, vector, metadata, usize::from(id % 5 == 0)).unwrap();
        }
        g
    }

    fn committed(g: &Hnsw, header: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        g.commit(&mut buf, header).unwrap();
        buf
    }

    #[test]
    fn test_config_block_layout() {
        let config = HnswOptions::default().build().unwrap();
        let mut buf = Vec::new();
        write_config(&mut buf, &config).unwrap();
        assert_eq!(buf.len(), 1 + 4 + 5 * 4 + 2);
        assert_eq!(buf[0], SearchAlgorithm::Simple.tag());
        assert_eq!(&buf[5..9], &20u32.to_be_bytes());
        assert_eq!(read_config(&mut buf.as_slice()).unwrap(), config);
    }

    #[test]
    fn test_config_block_revalidated() {
        let config = HnswOptions::default().build().unwrap();
        let mut buf = Vec::new();
        write_config(&mut buf, &config).unwrap();
        // m = 1
        buf[13..17].copy_from_slice(&1u32.to_be_bytes());
        assert!(matches!(
            read_config(&mut buf.as_slice()),
            Err(Error::CorruptData(_))
        ));
    }

    #[test]
    fn test_empty_graph_is_header_only() {
        let g = graph(DistanceMetric::Euclidean);
        let buf = committed(&g, true);
        assert_eq!(buf.len(), 27 + 4 + 1);
        assert_eq!(*buf.last().unwrap(), DistanceMetric::Euclidean.tag());

        let loaded = Hnsw::from_reader(buf.as_slice()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dim(), 2);
        assert!(loaded.entrypoint_id().is_none());
    }

    #[test]
    fn test_commit_is_deterministic() {
        let g = filled(DistanceMetric::Euclidean);
        assert_eq!(committed(&g, true), committed(&g, true));
    }

    #[test]
    fn test_header_restores_metric_and_config() {
        let g = Hnsw::new(
            2,
            DistanceMetric::Manhattan,
            HnswOptions::default()
                .with_m(4)
                .with_search_algorithm(SearchAlgorithm::Heuristic),
        )
        .unwrap();
        g.insert(1, vec![1.0, 2.0], Metadata::new(), 0).unwrap();

        let loaded = Hnsw::from_reader(committed(&g, true).as_slice()).unwrap();
        assert_eq!(loaded.distance(), "manhattan");
        assert_eq!(loaded.config(), g.config());
        assert_eq!(loaded.get(1).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_headerless_keeps_current_settings() {
        let g = filled(DistanceMetric::Euclidean);
        let buf = committed(&g, false);

        let mut target = graph(DistanceMetric::Euclidean);
        target.load(buf.as_slice(), false).unwrap();
        assert_eq!(target.len(), 20);
        assert_eq!(target.dim(), 2);
        for id in 0..20 {
            assert_eq!(target.get(id).unwrap(), g.get(id).unwrap());
        }
    }

    #[test]
    fn test_edges_survive_reload() {
        let g = filled(DistanceMetric::Euclidean);
        let loaded = Hnsw::from_reader(committed(&g, true).as_slice()).unwrap();
        assert_eq!(loaded.entrypoint_id(), g.entrypoint_id());
        for id in 0..20 {
            let before = g.get_vertex(id).unwrap();
            let after = loaded.get_vertex(id).unwrap();
            assert_eq!(before.level(), after.level());
            assert_eq!(before.metadata(), after.metadata());
            for level in 0..=before.level() {
                assert_eq!(before.neighbors(level), after.neighbors(level));
            }
        }
    }

    #[test]
    fn test_unknown_distance_tag() {
        let g = filled(DistanceMetric::Euclidean);
        let mut buf = committed(&g, true);
        buf[31] = 9;
        let mut target = graph(DistanceMetric::Euclidean);
        assert!(matches!(
            target.load(buf.as_slice(), true),
            Err(Error::InvalidDistanceKind(9))
        ));
    }

    #[test]
    fn test_unknown_entrypoint_is_corrupt() {
        let g = filled(DistanceMetric::Euclidean);
        let mut buf = committed(&g, true);
        buf[32..40].copy_from_slice(&999u64.to_be_bytes());
        let mut target = graph(DistanceMetric::Euclidean);
        assert!(matches!(
            target.load(buf.as_slice(), true),
            Err(Error::CorruptData(_))
        ));
    }

    #[test]
    fn test_truncated_stream_leaves_graph_untouched() {
        let g = filled(DistanceMetric::Euclidean);
        let buf = committed(&g, true);

        let mut target = graph(DistanceMetric::Euclidean);
        target.insert(100, vec![5.0, 5.0], Metadata::new(), 0).unwrap();
        let err = target.load(&buf[..buf.len() - 3], true).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(target.len(), 1);
        assert!(target.contains(100));
    }

    #[test]
    fn test_negative_level_is_corrupt() {
        let g = graph(DistanceMetric::Euclidean);
        g.insert(1, vec![1.0, 1.0], Metadata::new(), 0).unwrap();
        let mut buf = committed(&g, true);
        // header 32, entrypoint 8, then one shard count before vertex 1.
        let shard = VertexStore::shard_index(1);
        let level_at = 32 + 8 + 4 * (shard + 1) + 8;
        buf[level_at..level_at + 4].copy_from_slice(&(-1i32).to_be_bytes());
        let mut target = graph(DistanceMetric::Euclidean);
        assert!(matches!(
            target.load(buf.as_slice(), true),
            Err(Error::CorruptData(_))
        ));
    }
}
