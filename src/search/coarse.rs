//! Coarse search at the top of the pyramid.
//!
//! The coarsest level is scanned exhaustively once per frame. Candidates are
//! then drawn from the resulting score map, which lets `match_all` pick the
//! next-best location without rescanning.

use crate::candidate::nms::nms_2d;
use crate::image::{Bgr, ImageView};
use crate::kernel::{self, ScoreMap};
use crate::params::MatchMethod;
use crate::region::Region;
use crate::search::refine::{overlaps_any, Candidate};
use crate::search::{BEAM_WIDTH, COARSE_TOPK};
use crate::template::TemplatePlan;
use crate::trace::{trace_event, trace_span};
use crate::util::FrameMatchResult;

pub(crate) fn coarse_score_map(
    method: MatchMethod,
    image: ImageView<'_, Bgr>,
    plan: &TemplatePlan,
    level: usize,
) -> FrameMatchResult<ScoreMap> {
    let _span = trace_span!("coarse_scan", level = level).entered();
    kernel::score_map(method, image, plan)
}

/// Strongest, mutually distant placements at `level` that avoid `exclude`.
///
/// `tpl_size` is the full-resolution template size and `exclude` holds
/// full-resolution regions in search-area coordinates.
pub(crate) fn coarse_candidates(
    map: &ScoreMap,
    level: usize,
    tpl_size: (usize, usize),
    exclude: &[Region],
) -> Vec<Candidate> {
    let mut peaks = map.top_peaks(COARSE_TOPK, f32::NEG_INFINITY, |x, y| {
        !overlaps_any(level, x, y, tpl_size, exclude)
    });
    if peaks.is_empty() {
        return Vec::new();
    }

    let level_w = tpl_size.0 >> level;
    let level_h = tpl_size.1 >> level;
    let radius = (level_w.min(level_h) / 2).max(1);
    let mut kept = nms_2d(&mut peaks, radius);
    kept.truncate(BEAM_WIDTH);

    trace_event!("coarse_candidates", level = level, count = kept.len());
    kept.into_iter()
        .map(|peak| Candidate::from_peak(level, peak))
        .collect()
}
