//! 8-bit scalar quantization.
//!
//! Each component is mapped to a `u8` using the vector's own min/max
//! range. The original value is reconstructed as
//! `value = (data[i] / 255.0) * (max - min) + min`.

use super::{Quantization, QuantizationKind};
use crate::distance::DistanceEngine;

/// A vector lowered to one byte per component.
#[derive(Debug, Clone, PartialEq)]
pub struct Float8Vector {
    /// Quantized components.
    pub data: Vec<u8>,
    /// Minimum value in the original vector.
    pub min: f32,
    /// Maximum value in the original vector.
    pub max: f32,
}

impl Float8Vector {
    /// Quantizes an `f32` vector. An empty input yields an empty vector.
    #[must_use]
    pub fn from_f32(vector: &[f32]) -> Self {
        if vector.is_empty() {
            return Self {
                data: Vec::new(),
                min: 0.0,
                max: 0.0,
            };
        }

        let min = vector.iter().copied().fold(f32::INFINITY, f32::min);
        let max = vector.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let range = max - min;
        let data = if range < f32::EPSILON {
            // Constant vector, map to the middle of the range.
            vec![128u8; vector.len()]
        } else {
            let scale = 255.0 / range;
            // Clamped to [0, 255] before the cast.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            vector
                .iter()
                .map(|&v| ((v - min) * scale).round().clamp(0.0, 255.0) as u8)
                .collect()
        };

        Self { data, min, max }
    }

    /// Reconstructs an approximation of the original vector.
    #[must_use]
    pub fn to_f32(&self) -> Vec<f32> {
        let range = self.max - self.min;
        if range < f32::EPSILON {
            vec![self.min; self.data.len()]
        } else {
            let scale = range / 255.0;
            self.data
                .iter()
                .map(|&v| f32::from(v) * scale + self.min)
                .collect()
        }
    }

    /// Returns the dimension of the vector.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Returns the memory size in bytes.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.data.len() + 8
    }
}

/// Lowers vectors to [`Float8Vector`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float8Quantization;

impl Quantization for Float8Quantization {
    type Lowered = Float8Vector;

    fn lower(&self, vector: &[f32]) -> Float8Vector {
        Float8Vector::from_f32(vector)
    }

    fn similarity(
        &self,
        x: &Float8Vector,
        y: &Float8Vector,
        distance: &dyn DistanceEngine,
    ) -> f32 {
        distance.distance(&x.to_f32(), &y.to_f32())
    }

    fn name(&self) -> &'static str {
        QuantizationKind::Float8.as_str()
    }

    fn lower_size(&self, dim: usize) -> usize {
        dim + 8
    }
}
