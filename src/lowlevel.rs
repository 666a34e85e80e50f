//! Low-level building blocks for custom matching pipelines.
//!
//! These expose the scoring kernels, score maps, template plans and
//! candidate utilities behind [`crate::Matcher`]. Most callers should use
//! `Matcher` or `Harness` instead.

pub use crate::candidate::nms::nms_2d;
pub use crate::candidate::topk::{Peak, TopK};
pub use crate::image::pyramid::{downsample, max_safe_levels, Downsample, ImagePyramid};
pub use crate::kernel::scalar::{CcoeffNormedScalar, CcorrNormedScalar, SqdiffNormedScalar};
pub use crate::kernel::{Kernel, Moments, ScanParams, ScoreMap, WindowSums};
pub use crate::template::TemplatePlan;

#[cfg(feature = "rayon")]
pub use crate::kernel::rayon::{scan_full_par, score_map_par};

#[cfg(feature = "simd")]
pub use crate::kernel::simd::{CcoeffNormedSimd, CcorrNormedSimd, SqdiffNormedSimd};
