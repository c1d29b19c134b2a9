//! Distance providers for the HNSW graph.
//!
//! The graph only depends on the [`DistanceEngine`] trait. [`CpuDistance`]
//! is the scalar provider shipped with the crate; callers may plug in
//! their own engine as long as it is pure and thread-safe.

use serde::{Deserialize, Serialize};

/// Distance metric kinds understood by the snapshot codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`; vectors are normalized at insertion and query time.
    Cosine,
    /// Squared Euclidean distance.
    Euclidean,
    /// L1 distance.
    Manhattan,
}

impl DistanceMetric {
    /// Stable tag written into snapshot headers.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Cosine => 1,
            Self::Euclidean => 2,
            Self::Manhattan => 3,
        }
    }

    /// Inverse of [`DistanceMetric::tag`].
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Cosine),
            2 => Some(Self::Euclidean),
            3 => Some(Self::Manhattan),
            _ => None,
        }
    }

    /// Lowercase name, as reported by `Hnsw::distance`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
        }
    }

    /// Whether vectors must be unit-normalized before use.
    #[must_use]
    pub fn needs_normalization(self) -> bool {
        matches!(self, Self::Cosine)
    }
}

/// Trait for distance computation engines.
///
/// Implementations must be deterministic and side-effect free; the graph
/// calls them concurrently from every thread without synchronization.
pub trait DistanceEngine: Send + Sync {
    /// Computes the distance between two vectors (lower is closer).
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Returns the metric type for this engine.
    fn metric(&self) -> DistanceMetric;

    /// Returns the metric name.
    fn kind(&self) -> &'static str {
        self.metric().as_str()
    }
}

/// CPU scalar distance computation.
#[derive(Debug, Clone, Copy)]
pub struct CpuDistance {
    metric: DistanceMetric,
}

impl CpuDistance {
    /// Creates a new CPU distance engine with the given metric.
    #[must_use]
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }
}

impl DistanceEngine for CpuDistance {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::Cosine => cosine_distance_scalar(a, b),
            DistanceMetric::Euclidean => squared_euclidean_scalar(a, b),
            DistanceMetric::Manhattan => manhattan_distance_scalar(a, b),
        }
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

/// Normalizes a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
}

#[inline]
fn cosine_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        1.0
    } else {
        // Rounding can push identical vectors slightly below zero.
        (1.0 - dot / denom).max(0.0)
    }
}

#[inline]
fn squared_euclidean_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[inline]
fn manhattan_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let engine = CpuDistance::new(DistanceMetric::Cosine);
        let v = vec![1.0, 2.0, 3.0];
        let dist = engine.distance(&v, &v);
        assert!(dist.abs() < 1e-6, "Identical vectors should have distance ~0");
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        let engine = CpuDistance::new(DistanceMetric::Cosine);
        assert!((engine.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((engine.distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert!((engine.distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_is_squared() {
        let engine = CpuDistance::new(DistanceMetric::Euclidean);
        let dist = engine.distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]);
        assert!((dist - 25.0).abs() < 1e-5);
    }

    #[test]
    fn test_manhattan_known_distance() {
        let engine = CpuDistance::new(DistanceMetric::Manhattan);
        let dist = engine.distance(&[1.0, -2.0], &[4.0, 2.0]);
        assert!((dist - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_metric_tags_and_names() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::Euclidean,
            DistanceMetric::Manhattan,
        ] {
            assert_eq!(DistanceMetric::from_tag(metric.tag()), Some(metric));
            assert_eq!(CpuDistance::new(metric).kind(), metric.as_str());
        }
        assert_eq!(DistanceMetric::from_tag(0), None);
        assert!(DistanceMetric::Cosine.needs_normalization());
        assert!(!DistanceMetric::Euclidean.needs_normalization());
    }
}
