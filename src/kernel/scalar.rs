//! Scalar reference kernels and the metric definitions.
//!
//! Window sums are accumulated in exact integer arithmetic over all three
//! channels; only the final normalization uses floating point. This keeps
//! scores bit-identical between the serial, parallel and SIMD scans.

use crate::image::{Bgr, ImageView};
use crate::kernel::{Kernel, Moments};
use crate::template::TemplatePlan;

/// Squared-difference kernel, `1 - sum((t - i)^2) / sqrt(sum(t^2) * sum(i^2))`.
pub struct SqdiffNormedScalar;

/// Cross-correlation kernel, `sum(t * i) / sqrt(sum(t^2) * sum(i^2))`.
pub struct CcorrNormedScalar;

/// Correlation-coefficient kernel with per-channel mean removal.
pub struct CcoeffNormedScalar;

/// `sum(t * i)` over the window at `(x, y)`.
#[inline]
pub(crate) fn dot_scalar(
    image: ImageView<'_, Bgr>,
    plan: &TemplatePlan,
    x: usize,
    y: usize,
) -> u64 {
    let width = plan.width();
    let mut dot = 0u64;
    for ty in 0..plan.height() {
        let Some(row) = image.row(y + ty) else {
            break;
        };
        let win = row[x..x + width].as_flattened();
        let row_dot: u64 = win
            .iter()
            .zip(plan.packed_row(ty))
            .map(|(&i, &t)| u64::from(i) * u64::from(t))
            .sum();
        dot += row_dot;
    }
    dot
}

pub(crate) fn sqdiff_certainty(tpl_energy: u64, img_energy: u64, dot: u64) -> f32 {
    if tpl_energy == 0 && img_energy == 0 {
        // Black on black.
        return 1.0;
    }
    let denom = ((tpl_energy as f64) * (img_energy as f64)).sqrt();
    if denom <= 0.0 {
        return 0.0;
    }
    let sqdiff = (tpl_energy + img_energy - 2 * dot) as f64;
    (1.0 - (sqdiff / denom).min(1.0)) as f32
}

pub(crate) fn ccorr_certainty(tpl_energy: u64, img_energy: u64, dot: u64) -> f32 {
    if tpl_energy == 0 && img_energy == 0 {
        return 1.0;
    }
    let denom = ((tpl_energy as f64) * (img_energy as f64)).sqrt();
    if denom <= 0.0 {
        return 0.0;
    }
    ((dot as f64) / denom).clamp(0.0, 1.0) as f32
}

pub(crate) fn ccoeff_certainty(plan: &TemplatePlan, m: &Moments) -> f32 {
    let n = (plan.width() * plan.height()) as u128;
    let tpl_sums = plan.channel_sums();

    // Everything below is scaled by the pixel count `n` to stay integral.
    let img_squares: u128 = m.sums.iter().map(|&s| u128::from(s).pow(2)).sum();
    let img_var = (n * u128::from(m.energy)).saturating_sub(img_squares);
    let tpl_var = plan.scaled_centered_energy();
    if img_var == 0 || tpl_var == 0 {
        let flat_and_equal = img_var == 0 && tpl_var == 0 && m.sums == tpl_sums;
        return if flat_and_equal { 1.0 } else { 0.0 };
    }

    let cross: u128 = m
        .sums
        .iter()
        .zip(tpl_sums)
        .map(|(&si, st)| u128::from(si) * u128::from(st))
        .sum();
    let num = (n * u128::from(m.dot)) as f64 - cross as f64;
    let denom = ((tpl_var as f64) * (img_var as f64)).sqrt();
    (num / denom).clamp(0.0, 1.0) as f32
}

impl Kernel for SqdiffNormedScalar {
    fn dot(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
        dot_scalar(image, plan, x, y)
    }

    fn certainty(plan: &TemplatePlan, window: &Moments) -> f32 {
        sqdiff_certainty(plan.energy(), window.energy, window.dot)
    }
}

impl Kernel for CcorrNormedScalar {
    fn dot(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
        dot_scalar(image, plan, x, y)
    }

    fn certainty(plan: &TemplatePlan, window: &Moments) -> f32 {
        ccorr_certainty(plan.energy(), window.energy, window.dot)
    }
}

impl Kernel for CcoeffNormedScalar {
    const CHANNEL_SUMS: bool = true;

    fn dot(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
        dot_scalar(image, plan, x, y)
    }

    fn certainty(plan: &TemplatePlan, window: &Moments) -> f32 {
        ccoeff_certainty(plan, window)
    }
}
