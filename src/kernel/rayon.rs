//! Rayon-parallel scans (feature-gated).
//!
//! The exhaustive coarse-level scan is parallelized over placement rows. The
//! window tables are built once and shared by every row, and each row is
//! scored by the same kernel code as the serial path, so the resulting score
//! map is identical.

use crate::candidate::topk::{Peak, TopK};
use crate::image::{Bgr, ImageView};
use crate::kernel::{placement_range, Kernel, ScanParams, ScoreMap, WindowSums};
use crate::template::TemplatePlan;
use crate::util::FrameMatchResult;
use rayon::prelude::*;

/// Row-parallel exhaustive score map.
pub fn score_map_par<K: Kernel>(
    image: ImageView<'_, Bgr>,
    plan: &TemplatePlan,
) -> FrameMatchResult<ScoreMap> {
    let (max_x, max_y) = placement_range(&image, plan)?;
    let (w, h) = (max_x + 1, max_y + 1);
    let sums = WindowSums::new(image, K::CHANNEL_SUMS);
    let mut scores = vec![f32::NEG_INFINITY; w * h];
    scores
        .par_chunks_exact_mut(w)
        .enumerate()
        .for_each(|(y, row)| K::score_row(image, plan, &sums, y, row));
    Ok(ScoreMap::new(w, h, scores))
}

/// Row-parallel full scan returning the top-K peaks.
///
/// Per-row collectors are merged before the deterministic ordering is
/// applied, so the result matches `Kernel::scan_full`.
pub fn scan_full_par<K: Kernel>(
    image: ImageView<'_, Bgr>,
    plan: &TemplatePlan,
    params: ScanParams,
) -> FrameMatchResult<Vec<Peak>> {
    if params.topk == 0 {
        return Ok(Vec::new());
    }
    let (max_x, max_y) = placement_range(&image, plan)?;
    let sums = WindowSums::new(image, K::CHANNEL_SUMS);

    let merged = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut row_topk = TopK::new(params.topk);
            for x in 0..=max_x {
                let score = K::score_with(image, plan, &sums, (0, 0), x, y);
                if score.is_finite() && score >= params.min_score {
                    row_topk.push(Peak { x, y, score });
                }
            }
            row_topk
        })
        .reduce(
            || TopK::new(params.topk),
            |mut acc, row| {
                acc.extend(row);
                acc
            },
        );

    Ok(merged.into_sorted_desc())
}
