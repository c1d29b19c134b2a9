//! Vector lowering codecs for memory-constrained vector stores.
//!
//! The HNSW graph always keeps full `f32` vectors. Sibling stores that
//! trade precision for memory lower vectors through a [`Quantization`]
//! codec and compare them with [`Quantization::similarity`].
//!
//! | Codec | Bytes/dim | Notes |
//! |-------|-----------|-------|
//! | none | 4 | exact |
//! | float16 | 2 | IEEE 754 half |
//! | bfloat16 | 2 | truncated exponent-preserving |
//! | float8 | 1 (+8) | min/max scalar scaling |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::distance::DistanceEngine;

mod half_float;
mod scalar;

pub use half_float::{BFloat16Quantization, Float16Quantization};
pub use scalar::{Float8Quantization, Float8Vector};

/// A lossy (or identity) vector codec.
pub trait Quantization: Send + Sync {
    /// Lowered representation of one vector.
    type Lowered: Clone + Send + Sync;

    /// Lowers a full-precision vector.
    fn lower(&self, vector: &[f32]) -> Self::Lowered;

    /// Distance between two lowered vectors, widened back to `f32` and
    /// measured by `distance`.
    fn similarity(
        &self,
        x: &Self::Lowered,
        y: &Self::Lowered,
        distance: &dyn DistanceEngine,
    ) -> f32;

    /// Codec name.
    fn name(&self) -> &'static str;

    /// Bytes used by one lowered vector of `dim` components.
    fn lower_size(&self, dim: usize) -> usize;
}

/// Identity codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQuantization;

impl Quantization for NoQuantization {
    type Lowered = Vec<f32>;

    fn lower(&self, vector: &[f32]) -> Vec<f32> {
        vector.to_vec()
    }

    fn similarity(&self, x: &Vec<f32>, y: &Vec<f32>, distance: &dyn DistanceEngine) -> f32 {
        distance.distance(x, y)
    }

    fn name(&self) -> &'static str {
        QuantizationKind::None.as_str()
    }

    fn lower_size(&self, dim: usize) -> usize {
        dim * std::mem::size_of::<f32>()
    }
}

/// Names the available codecs, e.g. in collection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantizationKind {
    /// Full precision (default).
    #[default]
    None,
    /// IEEE half precision.
    Float16,
    /// Brain floating point.
    BFloat16,
    /// 8-bit scalar quantization.
    Float8,
}

impl QuantizationKind {
    /// Codec name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Float16 => "float16",
            Self::BFloat16 => "bfloat16",
            Self::Float8 => "float8",
        }
    }

    /// Bytes used by one lowered vector of `dim` components.
    #[must_use]
    pub fn lower_size(self, dim: usize) -> usize {
        match self {
            Self::None => NoQuantization.lower_size(dim),
            Self::Float16 => Float16Quantization.lower_size(dim),
            Self::BFloat16 => BFloat16Quantization.lower_size(dim),
            Self::Float8 => Float8Quantization.lower_size(dim),
        }
    }
}

impl fmt::Display for QuantizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
