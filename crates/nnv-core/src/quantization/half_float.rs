//! 16-bit float codecs backed by the `half` crate.

use half::{bf16, f16};

use super::{Quantization, QuantizationKind};
use crate::distance::DistanceEngine;

/// Lowers vectors to IEEE 754 half precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float16Quantization;

impl Quantization for Float16Quantization {
    type Lowered = Vec<f16>;

    fn lower(&self, vector: &[f32]) -> Vec<f16> {
        vector.iter().copied().map(f16::from_f32).collect()
    }

    fn similarity(&self, x: &Vec<f16>, y: &Vec<f16>, distance: &dyn DistanceEngine) -> f32 {
        let x: Vec<f32> = x.iter().copied().map(f16::to_f32).collect();
        let y: Vec<f32> = y.iter().copied().map(f16::to_f32).collect();
        distance.distance(&x, &y)
    }

    fn name(&self) -> &'static str {
        QuantizationKind::Float16.as_str()
    }

    fn lower_size(&self, dim: usize) -> usize {
        dim * std::mem::size_of::<f16>()
    }
}

/// Lowers vectors to bfloat16, keeping the f32 exponent range.
#[derive(Debug, Clone, Copy, Default)]
pub struct BFloat16Quantization;

impl Quantization for BFloat16Quantization {
    type Lowered = Vec<bf16>;

    fn lower(&self, vector: &[f32]) -> Vec<bf16> {
        vector.iter().copied().map(bf16::from_f32).collect()
    }

    fn similarity(&self, x: &Vec<bf16>, y: &Vec<bf16>, distance: &dyn DistanceEngine) -> f32 {
        let x: Vec<f32> = x.iter().copied().map(bf16::to_f32).collect();
        let y: Vec<f32> = y.iter().copied().map(bf16::to_f32).collect();
        distance.distance(&x, &y)
    }

    fn name(&self) -> &'static str {
        QuantizationKind::BFloat16.as_str()
    }

    fn lower_size(&self, dim: usize) -> usize {
        dim * std::mem::size_of::<bf16>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{CpuDistance, DistanceMetric};

    #[test]
    fn test_f16_preserves_small_integers() {
        let codec = Float16Quantization;
        let lowered = codec.lower(&[1.0, -2.0, 0.5, 1024.0]);
        let widened: Vec<f32> = lowered.iter().map(|v| v.to_f32()).collect();
        assert_eq!(widened, vec![1.0, -2.0, 0.5, 1024.0]);
    }

    #[test]
    fn test_f16_similarity_close_to_exact() {
        let engine = CpuDistance::new(DistanceMetric::Euclidean);
        let codec = Float16Quantization;
        let a = [0.123, 0.456, 0.789];
        let b = [0.321, 0.654, 0.987];
        let exact = engine.distance(&a, &b);
        let approx = codec.similarity(&codec.lower(&a), &codec.lower(&b), &engine);
        assert!((exact - approx).abs() < 5e-3);
    }

    #[test]
    fn test_bf16_keeps_large_range() {
        let codec = BFloat16Quantization;
        // Overflows f16 but not bf16.
        let lowered = codec.lower(&[1.0e10]);
        let widened = lowered[0].to_f32();
        assert!((widened - 1.0e10).abs() / 1.0e10 < 1e-2);
        assert!(Float16Quantization.lower(&[1.0e10])[0].is_infinite());
    }

    #[test]
    fn test_bf16_cosine_similarity() {
        let engine = CpuDistance::new(DistanceMetric::Cosine);
        let codec = BFloat16Quantization;
        let a = codec.lower(&[1.0, 0.0]);
        let b = codec.lower(&[0.0, 1.0]);
        assert!((codec.similarity(&a, &b, &engine) - 1.0).abs() < 1e-6);
        assert!(codec.similarity(&a, &a, &engine).abs() < 1e-6);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(Float16Quantization.lower_size(10), 20);
        assert_eq!(BFloat16Quantization.lower_size(10), 20);
    }
}
