//! Coarse-to-fine search for a template inside a frame.
//!
//! The frame (or the searched part of it) and the template are reduced to
//! the same pyramid depth. The coarsest level is scanned exhaustively, the
//! strongest distinct candidates are re-scored in a small window at each
//! finer level, and the best survivor at level 0 is reported.

pub(crate) mod coarse;
pub(crate) mod refine;

use crate::frame::Frame;
use crate::image::pyramid::ImagePyramid;
use crate::image::Bgr;
use crate::kernel::ScoreMap;
use crate::params::{MatchMethod, MatchParameters};
use crate::region::Region;
use crate::template::CompiledTemplate;
use crate::trace::{trace_event, trace_span};
use crate::util::{FrameMatchError, FrameMatchResult};

use coarse::{coarse_candidates, coarse_score_map};
use refine::{refine_to_finer_level, Candidate};

/// Certainty margin granted to candidates at levels above 0.
///
/// Downsampling blurs fine detail, so true matches score lower there.
pub const LEVEL_RELAXATION: f32 = 0.2;
pub(crate) const COARSE_TOPK: usize = 64;
pub(crate) const BEAM_WIDTH: usize = 16;
pub(crate) const ROI_RADIUS: usize = 2;

/// Best placement found by a search, in full-frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located {
    pub region: Region,
    pub certainty: f32,
}

/// Locates the best placement of `template` inside `frame`.
///
/// Returns the region in full-frame coordinates and its certainty. A weak
/// best placement is a normal outcome, not an error; only a template larger
/// than the frame fails.
pub fn locate(
    frame: &Frame,
    template: &CompiledTemplate,
    params: &MatchParameters,
) -> FrameMatchResult<(Region, f32)> {
    params.validate()?;
    let search = FrameSearch::new(frame, &Region::ALL, template, params)?;
    let located = search
        .best(&[])?
        .ok_or(FrameMatchError::TemplateTooLarge {
            tpl_width: template.width(),
            tpl_height: template.height(),
            area_width: frame.width(),
            area_height: frame.height(),
        })?;
    Ok((located.region, located.certainty))
}

/// Search state for one frame: the frame pyramid and the coarse score map.
pub(crate) struct FrameSearch<'t> {
    template: &'t CompiledTemplate,
    method: MatchMethod,
    threshold: f32,
    pyramid: ImagePyramid<Bgr>,
    coarse: ScoreMap,
    origin: (i64, i64),
}

impl<'t> FrameSearch<'t> {
    /// Prepares a search of `frame ∩ region`.
    pub(crate) fn new(
        frame: &Frame,
        region: &Region,
        template: &'t CompiledTemplate,
        params: &MatchParameters,
    ) -> FrameMatchResult<Self> {
        let (x, y, w, h) = frame.local_area(region)?;
        if w < template.width() || h < template.height() {
            return Err(FrameMatchError::TemplateTooLarge {
                tpl_width: template.width(),
                tpl_height: template.height(),
                area_width: w,
                area_height: h,
            });
        }
        let area = frame.view().roi(x, y, w, h)?;
        let (ox, oy) = frame.origin();
        let origin = (ox + x as i64, oy + y as i64);

        // A frame-sized template has a single placement; skip the pyramid.
        let levels = if (w, h) == (template.width(), template.height()) {
            1
        } else {
            template.num_levels()
        };
        let pyramid = ImagePyramid::build(area, levels)?;

        let top = pyramid.len() - 1;
        let (Some(image), Some(plan)) = (pyramid.level(top), template.plan(top)) else {
            return Err(FrameMatchError::InvalidDimensions { width: w, height: h });
        };
        let coarse = coarse_score_map(params.match_method, image, plan, top)?;

        Ok(Self {
            template,
            method: params.match_method,
            threshold: params.match_threshold,
            pyramid,
            coarse,
            origin,
        })
    }

    fn exclude_local(&self, exclude: &[Region]) -> Vec<Region> {
        exclude
            .iter()
            .map(|r| r.translate(-self.origin.0, -self.origin.1))
            .collect()
    }

    /// Best placement that does not overlap any region in `exclude`.
    ///
    /// Returns `None` once every placement overlaps an excluded region.
    pub(crate) fn best(&self, exclude: &[Region]) -> FrameMatchResult<Option<Located>> {
        let _span = trace_span!("locate", levels = self.pyramid.len()).entered();
        let tpl_size = (self.template.width(), self.template.height());
        let exclude = self.exclude_local(exclude);

        let top = self.pyramid.len() - 1;
        let mut current = coarse_candidates(&self.coarse, top, tpl_size, &exclude);
        let relaxed = (self.threshold - LEVEL_RELAXATION).max(0.0);

        for level in (0..top).rev() {
            let (Some(image), Some(plan)) = (self.pyramid.level(level), self.template.plan(level))
            else {
                return Err(FrameMatchError::InvalidDimensions {
                    width: tpl_size.0,
                    height: tpl_size.1,
                });
            };
            let refined = refine_to_finer_level(
                self.method,
                image,
                plan,
                level,
                &promising(current, relaxed),
                tpl_size,
                &exclude,
            )?;
            if let Some(best) = refined.first() {
                trace_event!("level_best", level = level, certainty = best.score);
            }
            current = refined;
        }

        Ok(current.first().map(|&c| self.candidate_to_located(c)))
    }

    fn candidate_to_located(&self, cand: Candidate) -> Located {
        let (x, y) = cand.full_res_pos();
        let region = Region::of_size(self.template.width(), self.template.height())
            .translate(self.origin.0 + x as i64, self.origin.1 + y as i64);
        Located {
            region,
            certainty: cand.score,
        }
    }
}

/// Candidates that clear the relaxed threshold, or the single best one.
///
/// The best candidate is always carried to full resolution so the reported
/// certainty is measured there.
fn promising(candidates: Vec<Candidate>, relaxed: f32) -> Vec<Candidate> {
    let Some(&best) = candidates.first() else {
        return candidates;
    };
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.score >= relaxed)
        .collect();
    if kept.is_empty() {
        vec![best]
    } else {
        kept
    }
}
