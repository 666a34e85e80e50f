//! Pixel-accurate confirmation of a matcher candidate.
//!
//! Correlation scores alone accept screens that are structurally similar but
//! wrong (same background, different highlighted item). Confirmation compares
//! the candidate area with the reference image pixel by pixel in grayscale,
//! erodes the resulting difference mask to discard isolated noise pixels and
//! accepts the candidate only if nothing survives.

use crate::debug::{emit_gray, DebugSink};
use crate::image::ops::{
    absdiff, bgr_to_gray, count_nonzero, erode_n, normalize_min_max, threshold_binary,
};
use crate::image::{Bgr, ImageView};
use crate::params::{ConfirmMethod, MatchParameters};
use crate::trace::{trace_event, trace_span};
use crate::util::math::fraction_to_level;
use crate::util::{FrameMatchError, FrameMatchResult};

/// Confirms that `frame_roi` shows the reference image `template_gray`.
///
/// `frame_roi` is the candidate area of the frame and must have the size of
/// the reference image.
pub fn confirm(
    frame_roi: ImageView<'_, Bgr>,
    template_gray: ImageView<'_, u8>,
    params: &MatchParameters,
) -> FrameMatchResult<bool> {
    confirm_with(frame_roi, template_gray, params, None)
}

/// As [`confirm`], recording each intermediate image in `sink`.
pub fn confirm_with(
    frame_roi: ImageView<'_, Bgr>,
    template_gray: ImageView<'_, u8>,
    params: &MatchParameters,
    sink: Option<&dyn DebugSink>,
) -> FrameMatchResult<bool> {
    params.validate()?;
    if (frame_roi.width(), frame_roi.height()) != (template_gray.width(), template_gray.height()) {
        return Err(FrameMatchError::SizeMismatch {
            expected_width: template_gray.width(),
            expected_height: template_gray.height(),
            width: frame_roi.width(),
            height: frame_roi.height(),
        });
    }
    if params.confirm_method == ConfirmMethod::None {
        return Ok(true);
    }

    let _span = trace_span!("confirm", method = params.confirm_method.as_str()).entered();
    let gray = bgr_to_gray(frame_roi);
    emit_gray(sink, "gray-roi", gray.view());

    let diff = match params.confirm_method {
        ConfirmMethod::NormedAbsdiff => {
            let roi = normalize_min_max(gray.view());
            let tpl = normalize_min_max(template_gray);
            emit_gray(sink, "normed-roi", roi.view());
            emit_gray(sink, "normed-template", tpl.view());
            absdiff(roi.view(), tpl.view())?
        }
        _ => absdiff(gray.view(), template_gray)?,
    };
    emit_gray(sink, "absdiff", diff.view());

    let level = fraction_to_level(params.confirm_threshold);
    let thresholded = threshold_binary(diff.view(), level);
    emit_gray(sink, "thresholded", thresholded.view());

    let eroded = erode_n(thresholded.view(), params.erode_passes);
    emit_gray(sink, "eroded", eroded.view());

    let remaining = count_nonzero(eroded.view());
    trace_event!("confirm_result", differing_pixels = remaining);
    Ok(remaining == 0)
}
