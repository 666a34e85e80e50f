//! Single-frame matching: locate, then confirm.
//!
//! A `Matcher` owns a compiled reference image and the parameters it is
//! matched with. It is built once per call (or once per wait) and evaluated
//! against every frame; it holds no per-frame state.

use crate::confirm::confirm_with;
use crate::debug::{emit_bgr, DebugSink, Scoped};
use crate::frame::Frame;
use crate::params::MatchParameters;
use crate::region::Region;
use crate::search::{FrameSearch, Located};
use crate::template::{CompiledTemplate, Template};
use crate::trace::trace_event;
use crate::util::{FrameMatchError, FrameMatchResult};

/// Verdict of matching one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// True if the best placement cleared the threshold and was confirmed.
    pub matched: bool,
    /// Best placement in full-frame coordinates, matched or not.
    pub region: Region,
    /// Certainty of the best placement, in `[0, 1]`.
    pub first_pass_certainty: f32,
    /// The frame that was evaluated.
    pub frame: Frame,
    pub timestamp: f64,
    /// Name of the reference image.
    pub template: String,
}

/// Matches one reference image against frames.
pub struct Matcher {
    compiled: CompiledTemplate,
    params: MatchParameters,
}

impl Matcher {
    /// Validates `params` and compiles `template` for the requested pyramid depth.
    pub fn new(template: &Template, params: MatchParameters) -> FrameMatchResult<Self> {
        params.validate()?;
        let compiled = CompiledTemplate::compile(template, params.pyramid_levels)?;
        Ok(Self { compiled, params })
    }

    pub fn template(&self) -> &CompiledTemplate {
        &self.compiled
    }

    pub fn params(&self) -> &MatchParameters {
        &self.params
    }

    /// Evaluates `frame`, searching only inside `region`.
    pub fn match_frame(&self, frame: &Frame, region: &Region) -> FrameMatchResult<MatchResult> {
        self.match_frame_with(frame, region, None)
    }

    /// As [`Matcher::match_frame`], recording intermediate images in `sink`.
    pub fn match_frame_with(
        &self,
        frame: &Frame,
        region: &Region,
        sink: Option<&dyn DebugSink>,
    ) -> FrameMatchResult<MatchResult> {
        let search = FrameSearch::new(frame, region, &self.compiled, &self.params)?;
        let located = search.best(&[])?.ok_or_else(|| self.too_large(frame))?;
        let matched = self.verify(frame, &located, sink)?;
        Ok(self.result(frame, located, matched))
    }

    /// Every non-overlapping confirmed occurrence inside `region`, best first.
    ///
    /// Stops at the first placement that fails the threshold or confirmation,
    /// so the result may be empty.
    pub fn match_all(&self, frame: &Frame, region: &Region) -> FrameMatchResult<Vec<MatchResult>> {
        self.match_all_with(frame, region, None)
    }

    /// As [`Matcher::match_all`], recording each attempt under `matchN/`.
    pub fn match_all_with(
        &self,
        frame: &Frame,
        region: &Region,
        sink: Option<&dyn DebugSink>,
    ) -> FrameMatchResult<Vec<MatchResult>> {
        let search = FrameSearch::new(frame, region, &self.compiled, &self.params)?;
        let mut found: Vec<MatchResult> = Vec::new();
        let mut exclude: Vec<Region> = Vec::new();
        loop {
            let Some(located) = search.best(&exclude)? else {
                break;
            };
            let scoped = sink.map(|s| Scoped::new(s, format!("match{}", found.len())));
            let scoped = scoped.as_ref().map(|s| s as &dyn DebugSink);
            if !self.verify(frame, &located, scoped)? {
                break;
            }
            exclude.push(located.region);
            found.push(self.result(frame, located, true));
        }
        trace_event!("match_all", count = found.len());
        Ok(found)
    }

    fn verify(
        &self,
        frame: &Frame,
        located: &Located,
        sink: Option<&dyn DebugSink>,
    ) -> FrameMatchResult<bool> {
        if located.certainty < self.params.match_threshold {
            return Ok(false);
        }
        let (x, y, w, h) = frame.local_area(&located.region)?;
        let roi = frame.view().roi(x, y, w, h)?;
        emit_bgr(sink, "candidate", roi);
        confirm_with(roi, self.compiled.gray(), &self.params, sink)
    }

    fn result(&self, frame: &Frame, located: Located, matched: bool) -> MatchResult {
        MatchResult {
            matched,
            region: located.region,
            first_pass_certainty: located.certainty,
            frame: frame.clone(),
            timestamp: frame.timestamp(),
            template: self.compiled.name().to_owned(),
        }
    }

    fn too_large(&self, frame: &Frame) -> FrameMatchError {
        FrameMatchError::TemplateTooLarge {
            tpl_width: self.compiled.width(),
            tpl_height: self.compiled.height(),
            area_width: frame.width(),
            area_height: frame.height(),
        }
    }
}

/// One-shot match of `template` anywhere in `frame`.
pub fn match_frame(
    template: &Template,
    frame: &Frame,
    params: &MatchParameters,
) -> FrameMatchResult<MatchResult> {
    Matcher::new(template, params.clone())?.match_frame(frame, &Region::ALL)
}
