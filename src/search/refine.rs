//! Refinement search around coarse candidates.
//!
//! Candidates are upsampled to the next finer level and re-scored in a small
//! window around the predicted position until level 0 is reached.

use crate::candidate::nms::nms_2d;
use crate::candidate::topk::Peak;
use crate::image::{Bgr, ImageView};
use crate::kernel::{self, placement_range, ScanParams};
use crate::params::MatchMethod;
use crate::region::Region;
use crate::search::{BEAM_WIDTH, ROI_RADIUS};
use crate::template::TemplatePlan;
use crate::util::FrameMatchResult;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) level: usize,
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) score: f32,
}

impl Candidate {
    pub(crate) fn from_peak(level: usize, peak: Peak) -> Self {
        Self {
            level,
            x: peak.x,
            y: peak.y,
            score: peak.score,
        }
    }

    /// Position of this candidate at full resolution.
    pub(crate) fn full_res_pos(&self) -> (usize, usize) {
        (self.x << self.level, self.y << self.level)
    }
}

/// True if the template placed at level-`level` position `(x, y)` overlaps
/// any of the full-resolution regions in `exclude`.
pub(crate) fn overlaps_any(
    level: usize,
    x: usize,
    y: usize,
    tpl_size: (usize, usize),
    exclude: &[Region],
) -> bool {
    if exclude.is_empty() {
        return false;
    }
    let placed = Region::of_size(tpl_size.0, tpl_size.1)
        .translate((x << level) as i64, (y << level) as i64);
    exclude.iter().any(|r| r.intersect(&placed).is_some())
}

fn upscale_pos(x: usize, y: usize) -> (usize, usize) {
    (x.saturating_mul(2), y.saturating_mul(2))
}

fn roi_bounds(
    x: usize,
    y: usize,
    radius: usize,
    max_x: usize,
    max_y: usize,
) -> Option<(usize, usize, usize, usize)> {
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    if x0 > max_x || y0 > max_y {
        return None;
    }
    let x1 = x.saturating_add(radius).min(max_x);
    let y1 = y.saturating_add(radius).min(max_y);
    Some((x0, y0, x1, y1))
}

/// Re-scores `prev` candidates in a window at `finer_level`.
///
/// Placements overlapping `exclude` are skipped; the result is empty only
/// when every placement near the candidates is excluded.
#[allow(clippy::too_many_arguments)]
pub(crate) fn refine_to_finer_level(
    method: MatchMethod,
    image: ImageView<'_, Bgr>,
    plan: &TemplatePlan,
    finer_level: usize,
    prev: &[Candidate],
    tpl_size: (usize, usize),
    exclude: &[Region],
) -> FrameMatchResult<Vec<Candidate>> {
    if prev.is_empty() {
        return Ok(Vec::new());
    }

    let (max_x, max_y) = placement_range(&image, plan)?;
    let window = 2 * ROI_RADIUS + 1;
    let params = ScanParams {
        topk: window * window,
        min_score: f32::NEG_INFINITY,
    };

    let mut all_peaks = Vec::new();
    for cand in prev.iter().copied() {
        debug_assert!(cand.level > finer_level);
        let (x_up, y_up) = upscale_pos(cand.x, cand.y);
        let Some((x0, y0, x1, y1)) = roi_bounds(x_up, y_up, ROI_RADIUS, max_x, max_y) else {
            continue;
        };
        let peaks = kernel::scan_roi(method, image, plan, x0, y0, x1, y1, params)?;
        all_peaks.extend(
            peaks
                .into_iter()
                .filter(|p| !overlaps_any(finer_level, p.x, p.y, tpl_size, exclude)),
        );
    }

    if all_peaks.is_empty() {
        return Ok(Vec::new());
    }

    // Windows of neighbouring candidates overlap, so the same placement can
    // appear twice.
    let mut kept = nms_2d(&mut all_peaks, 1);
    kept.truncate(BEAM_WIDTH);

    Ok(kept
        .into_iter()
        .map(|peak| Candidate::from_peak(finer_level, peak))
        .collect())
}
