//! Normalized matching kernels.
//!
//! Every kernel reports a certainty in `[0, 1]` where higher is better, so
//! the search code never needs to know which metric is in use. Kernels only
//! differ in how they compute the template dot product and how they turn
//! window moments into a certainty; window energy and channel sums come from
//! [`WindowSums`].

use crate::candidate::topk::{Peak, TopK};
use crate::image::{Bgr, ImageView};
use crate::params::MatchMethod;
use crate::template::TemplatePlan;
use crate::util::{FrameMatchError, FrameMatchResult};

pub mod scalar;
pub mod window;

#[cfg(feature = "rayon")]
pub mod rayon;

#[cfg(feature = "simd")]
pub mod simd;

pub use window::{Moments, WindowSums};

#[cfg(not(feature = "simd"))]
use scalar::{
    CcoeffNormedScalar as Ccoeff, CcorrNormedScalar as Ccorr, SqdiffNormedScalar as Sqdiff,
};
#[cfg(feature = "simd")]
use simd::{CcoeffNormedSimd as Ccoeff, CcorrNormedSimd as Ccorr, SqdiffNormedSimd as Sqdiff};

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Maximum number of peaks to retain.
    pub topk: usize,
    /// Minimum certainty (discard below this value).
    pub min_score: f32,
}

/// Certainty for every valid placement at one pyramid level.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreMap {
    width: usize,
    height: usize,
    scores: Vec<f32>,
}

impl ScoreMap {
    pub(crate) fn new(width: usize, height: usize, scores: Vec<f32>) -> Self {
        debug_assert_eq!(scores.len(), width * height);
        Self {
            width,
            height,
            scores,
        }
    }

    /// Number of horizontal placements.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of vertical placements.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width {
            return None;
        }
        self.scores.get(y * self.width + x).copied()
    }

    /// Best `k` placements accepted by `accept`, in descending order.
    pub fn top_peaks<F>(&self, k: usize, min_score: f32, accept: F) -> Vec<Peak>
    where
        F: Fn(usize, usize) -> bool,
    {
        let mut topk = TopK::new(k);
        for (y, row) in self.scores.chunks_exact(self.width).enumerate() {
            for (x, &score) in row.iter().enumerate() {
                if score.is_finite() && score >= min_score && accept(x, y) {
                    topk.push(Peak { x, y, score });
                }
            }
        }
        topk.into_sorted_desc()
    }
}

/// Returns the largest valid top-left placement `(max_x, max_y)`.
pub(crate) fn placement_range(
    image: &ImageView<'_, Bgr>,
    plan: &TemplatePlan,
) -> FrameMatchResult<(usize, usize)> {
    if image.width() < plan.width() || image.height() < plan.height() {
        return Err(FrameMatchError::TemplateTooLarge {
            tpl_width: plan.width(),
            tpl_height: plan.height(),
            area_width: image.width(),
            area_height: image.height(),
        });
    }
    Ok((image.width() - plan.width(), image.height() - plan.height()))
}

/// Kernel trait for scoring and scan operations.
pub trait Kernel {
    /// Whether `certainty` reads `Moments::sums`.
    const CHANNEL_SUMS: bool = false;

    /// `sum(t * i)` for the placement at `(x, y)`, which must be valid.
    fn dot(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> u64;

    /// Maps the moments of a window to a certainty in `[0, 1]`.
    fn certainty(plan: &TemplatePlan, window: &Moments) -> f32;

    /// Computes the certainty at a single placement (top-left coordinates).
    ///
    /// Out-of-range placements score `f32::NEG_INFINITY`.
    fn score_at(image: ImageView<'_, Bgr>, plan: &TemplatePlan, x: usize, y: usize) -> f32 {
        let Ok((max_x, max_y)) = placement_range(&image, plan) else {
            return f32::NEG_INFINITY;
        };
        if x > max_x || y > max_y {
            return f32::NEG_INFINITY;
        }
        let mut m = window::direct_moments(image, x, y, plan.width(), plan.height());
        m.dot = Self::dot(image, plan, x, y);
        Self::certainty(plan, &m)
    }

    /// Certainty at `(x, y)` with window statistics read from `sums`.
    ///
    /// `sums` covers `image` from `origin` onwards.
    #[inline]
    fn score_with(
        image: ImageView<'_, Bgr>,
        plan: &TemplatePlan,
        sums: &WindowSums,
        origin: (usize, usize),
        x: usize,
        y: usize,
    ) -> f32 {
        let (sx, sy) = (x - origin.0, y - origin.1);
        let (w, h) = (plan.width(), plan.height());
        let m = Moments {
            dot: Self::dot(image, plan, x, y),
            energy: sums.energy(sx, sy, w, h),
            sums: sums.channel_sums(sx, sy, w, h),
        };
        Self::certainty(plan, &m)
    }

    /// Scores every placement of row `y` into `out`.
    fn score_row(
        image: ImageView<'_, Bgr>,
        plan: &TemplatePlan,
        sums: &WindowSums,
        y: usize,
        out: &mut [f32],
    ) {
        for (x, slot) in out.iter_mut().enumerate() {
            *slot = Self::score_with(image, plan, sums, (0, 0), x, y);
        }
    }

    /// Scores every valid placement.
    fn score_map(image: ImageView<'_, Bgr>, plan: &TemplatePlan) -> FrameMatchResult<ScoreMap> {
        let (max_x, max_y) = placement_range(&image, plan)?;
        let (w, h) = (max_x + 1, max_y + 1);
        let sums = WindowSums::new(image, Self::CHANNEL_SUMS);
        let mut scores = vec![f32::NEG_INFINITY; w * h];
        for (y, row) in scores.chunks_exact_mut(w).enumerate() {
            Self::score_row(image, plan, &sums, y, row);
        }
        Ok(ScoreMap::new(w, h, scores))
    }

    /// Scans the full valid placement range and returns top-K peaks.
    fn scan_full(
        image: ImageView<'_, Bgr>,
        plan: &TemplatePlan,
        params: ScanParams,
    ) -> FrameMatchResult<Vec<Peak>> {
        let (max_x, max_y) = placement_range(&image, plan)?;
        Self::scan_roi(image, plan, 0, 0, max_x, max_y, params)
    }

    /// Scans an inclusive ROI of placement coordinates and returns top-K peaks.
    #[allow(clippy::too_many_arguments)]
    fn scan_roi(
        image: ImageView<'_, Bgr>,
        plan: &TemplatePlan,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
        params: ScanParams,
    ) -> FrameMatchResult<Vec<Peak>> {
        if params.topk == 0 {
            return Ok(Vec::new());
        }
        let (max_x, max_y) = placement_range(&image, plan)?;
        if x0 > max_x || y0 > max_y {
            return Ok(Vec::new());
        }
        let x1 = x1.min(max_x);
        let y1 = y1.min(max_y);
        if x0 > x1 || y0 > y1 {
            return Ok(Vec::new());
        }

        // Tables only over the pixels the ROI's placements touch.
        let covered = image.roi(
            x0,
            y0,
            x1 - x0 + plan.width(),
            y1 - y0 + plan.height(),
        )?;
        let sums = WindowSums::new(covered, Self::CHANNEL_SUMS);

        let mut topk = TopK::new(params.topk);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let score = Self::score_with(image, plan, &sums, (x0, y0), x, y);
                if score.is_finite() && score >= params.min_score {
                    topk.push(Peak { x, y, score });
                }
            }
        }
        Ok(topk.into_sorted_desc())
    }
}

/// Exhaustive scan with the given method, row-parallel when `rayon` is enabled.
pub(crate) fn score_map(
    method: MatchMethod,
    image: ImageView<'_, Bgr>,
    plan: &TemplatePlan,
) -> FrameMatchResult<ScoreMap> {
    #[cfg(feature = "rayon")]
    {
        match method {
            MatchMethod::SqdiffNormed => self::rayon::score_map_par::<Sqdiff>(image, plan),
            MatchMethod::CcorrNormed => self::rayon::score_map_par::<Ccorr>(image, plan),
            MatchMethod::CcoeffNormed => self::rayon::score_map_par::<Ccoeff>(image, plan),
        }
    }
    #[cfg(not(feature = "rayon"))]
    {
        match method {
            MatchMethod::SqdiffNormed => Sqdiff::score_map(image, plan),
            MatchMethod::CcorrNormed => Ccorr::score_map(image, plan),
            MatchMethod::CcoeffNormed => Ccoeff::score_map(image, plan),
        }
    }
}

/// Local scan with the given method.
#[allow(clippy::too_many_arguments)]
pub(crate) fn scan_roi(
    method: MatchMethod,
    image: ImageView<'_, Bgr>,
    plan: &TemplatePlan,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    params: ScanParams,
) -> FrameMatchResult<Vec<Peak>> {
    match method {
        MatchMethod::SqdiffNormed => Sqdiff::scan_roi(image, plan, x0, y0, x1, y1, params),
        MatchMethod::CcorrNormed => Ccorr::scan_roi(image, plan, x0, y0, x1, y1, params),
        MatchMethod::CcoeffNormed => Ccoeff::scan_roi(image, plan, x0, y0, x1, y1, params),
    }
}
