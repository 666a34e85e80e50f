//! Template plan precomputation for normalized matching metrics.

use crate::image::{Bgr, ImageView};
use crate::util::{FrameMatchError, FrameMatchResult};

/// Precomputed statistics and packed channel buffer for one pyramid level.
///
/// All sums are exact integers; the kernels only leave integer arithmetic
/// for the final normalization.
pub struct TemplatePlan {
    width: usize,
    height: usize,
    packed: Vec<u8>,
    #[cfg(feature = "simd")]
    floats: Vec<f32>,
    channel_sums: [u64; 3],
    energy: u64,
}

impl TemplatePlan {
    /// Builds a plan from a BGR template view.
    pub fn from_view(tpl: ImageView<'_, Bgr>) -> FrameMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or(FrameMatchError::InvalidDimensions { width, height })?;

        let mut packed = Vec::with_capacity(count);
        let mut channel_sums = [0u64; 3];
        let mut energy = 0u64;
        for row in tpl.rows() {
            for px in row {
                for (c, &v) in px.iter().enumerate() {
                    let v64 = u64::from(v);
                    channel_sums[c] += v64;
                    energy += v64 * v64;
                    packed.push(v);
                }
            }
        }

        Ok(Self {
            width,
            height,
            #[cfg(feature = "simd")]
            floats: packed.iter().map(|&v| f32::from(v)).collect(),
            packed,
            channel_sums,
            energy,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of samples across all three channels.
    pub fn sample_count(&self) -> usize {
        self.packed.len()
    }

    /// Returns the packed `b, g, r` samples in row-major order.
    pub fn packed(&self) -> &[u8] {
        &self.packed
    }

    /// Packed samples of template row `y`.
    #[inline]
    pub(crate) fn packed_row(&self, y: usize) -> &[u8] {
        let len = self.width * 3;
        &self.packed[y * len..(y + 1) * len]
    }

    /// Samples of template row `y` as `f32`, for the SIMD kernels.
    #[cfg(feature = "simd")]
    #[inline]
    pub(crate) fn float_row(&self, y: usize) -> &[f32] {
        let len = self.width * 3;
        &self.floats[y * len..(y + 1) * len]
    }

    /// Per-channel sums of the template samples.
    pub fn channel_sums(&self) -> [u64; 3] {
        self.channel_sums
    }

    /// Sum of squared samples over all channels.
    pub fn energy(&self) -> u64 {
        self.energy
    }

    /// Sum of squared deviations from the per-channel means.
    pub fn centered_energy(&self) -> f64 {
        self.scaled_centered_energy() as f64 / (self.width * self.height) as f64
    }

    /// `centered_energy` multiplied by the pixel count, computed exactly.
    pub(crate) fn scaled_centered_energy(&self) -> u128 {
        let n = (self.width * self.height) as u128;
        let squares: u128 = self.channel_sums.iter().map(|&s| u128::from(s).pow(2)).sum();
        (n * u128::from(self.energy)).saturating_sub(squares)
    }
}
