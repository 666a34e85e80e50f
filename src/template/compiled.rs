//! Precomputed template assets for coarse-to-fine search.
//!
//! Compiling a template once amortizes the cost of building its pyramid,
//! per-level statistics and grayscale copy across every frame it is matched
//! against during a wait.

use crate::image::ops::bgr_to_gray;
use crate::image::pyramid::{max_safe_levels, ImagePyramid};
use crate::image::{ImageView, OwnedImage};
use crate::template::{Template, TemplatePlan};
use crate::util::FrameMatchResult;

/// Compiled template assets: one plan per pyramid level and a gray copy.
pub struct CompiledTemplate {
    name: String,
    plans: Vec<TemplatePlan>,
    gray: OwnedImage<u8>,
}

impl CompiledTemplate {
    /// Compiles template assets for matching with up to `max_levels` levels.
    ///
    /// The depth is reduced so the coarsest level is still at least 2x2.
    pub fn compile(tpl: &Template, max_levels: usize) -> FrameMatchResult<Self> {
        let levels = max_safe_levels(tpl.width(), tpl.height(), max_levels);
        let pyramid = ImagePyramid::build(tpl.view(), levels)?;
        let plans = pyramid
            .levels()
            .iter()
            .map(|level| TemplatePlan::from_view(level.view()))
            .collect::<FrameMatchResult<Vec<_>>>()?;
        Ok(Self {
            name: tpl.name().to_owned(),
            plans,
            gray: bgr_to_gray(tpl.view()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of pyramid levels.
    pub fn num_levels(&self) -> usize {
        self.plans.len()
    }

    /// Returns the plan for a pyramid level.
    pub fn plan(&self, level: usize) -> Option<&TemplatePlan> {
        self.plans.get(level)
    }

    /// Returns the width and height for a pyramid level.
    pub fn level_size(&self, level: usize) -> Option<(usize, usize)> {
        self.plan(level).map(|p| (p.width(), p.height()))
    }

    /// Full-resolution width.
    pub fn width(&self) -> usize {
        self.gray.width()
    }

    /// Full-resolution height.
    pub fn height(&self) -> usize {
        self.gray.height()
    }

    /// Grayscale copy used by confirmation.
    pub fn gray(&self) -> ImageView<'_, u8> {
        self.gray.view()
    }
}
