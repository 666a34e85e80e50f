//! SIMD-accelerated kernels using the `wide` crate.
//!
//! The template dot product is vectorized to process 8 samples at a time
//! using `f32x8`. Samples and their products are small integers, so every
//! lane stays exact as long as it accumulates fewer than `SEGMENT / LANES`
//! products; each segment is reduced to `u64` before the next starts. The
//! result equals the scalar dot product bit for bit.

use crate::image::{Bgr, ImageView};
use crate::kernel::scalar::{ccoeff_certainty, ccorr_certainty, sqdiff_certainty};
use crate::kernel::{Kernel, Moments};
use crate::template::TemplatePlan;
use wide::f32x8;

const LANES: usize = 8;

/// Samples per exact segment: 256 products of at most `255 * 255` per lane
/// stay below 2^24.
const SEGMENT: usize = 256 * LANES;

/// Load 8 u8 values and convert to f32x8.
#[inline]
fn load_u8x8_as_f32x8(slice: &[u8]) -> f32x8 {
    f32x8::from([
        slice[0] as f32,
        slice[1] as f32,
        slice[2] as f32,
        slice[3] as f32,
        slice[4] as f32,
        slice[5] as f32,
        slice[6] as f32,
        slice[7] as f32,
    ])
}

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

#[inline]
fn dot_segment(win: &[u8], tpl: &[f32]) -> u64 {
    let simd_end = win.len() / LANES * LANES;
    let mut dot_vec = f32x8::ZERO;
    let mut tx = 0;
    while tx < simd_end {
        dot_vec += load_u8x8_as_f32x8(&win[tx..]) * load_f32x8(&tpl[tx..]);
        tx += LANES;
    }
    let lanes: u64 = dot_vec.to_array().iter().map(|&v| v as u64).sum();

    // Scalar remainder
    let rest: u64 = win[simd_end..]
        .iter()
        .zip(&tpl[simd_end..])
        .map(|(&i, &t)| u64::from(i) * t as u64)
        .sum();
    lanes + rest
}

/// `sum(t * i)` over the window at `(x, y)`.
#[inline]
fn dot_simd(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
    let width = plan.width();
    let mut dot = 0u64;
    for ty in 0..plan.height() {
        let Some(row) = image.row(y + ty) else {
            break;
        };
        let win = row[x..x + width].as_flattened();
        for (w, t) in win.chunks(SEGMENT).zip(plan.float_row(ty).chunks(SEGMENT)) {
            dot += dot_segment(w, t);
        }
    }
    dot
}

/// SIMD counterpart of [`SqdiffNormedScalar`](crate::kernel::scalar::SqdiffNormedScalar).
pub struct SqdiffNormedSimd;

/// SIMD counterpart of [`CcorrNormedScalar`](crate::kernel::scalar::CcorrNormedScalar).
pub struct CcorrNormedSimd;

/// SIMD counterpart of [`CcoeffNormedScalar`](crate::kernel::scalar::CcoeffNormedScalar).
pub struct CcoeffNormedSimd;

impl Kernel for SqdiffNormedSimd {
    fn dot(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
        dot_simd(image, plan, x, y)
    }

    fn certainty(plan: &TemplatePlan, window: &Moments) -> f32 {
        sqdiff_certainty(plan.energy(), window.energy, window.dot)
    }
}

impl Kernel for CcorrNormedSimd {
    fn dot(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
        dot_simd(image, plan, x, y)
    }

    fn certainty(plan: &TemplatePlan, window: &Moments) -> f32 {
        ccorr_certainty(plan.energy(), window.energy, window.dot)
    }
}

impl Kernel for CcoeffNormedSimd {
    const CHANNEL_SUMS: bool = true;

    fn dot(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
        dot_simd(image, plan, x, y)
    }

    fn certainty(plan: &TemplatePlan, window: &Moments) -> f32 {
        ccoeff_certainty(plan, window)
    }
}
