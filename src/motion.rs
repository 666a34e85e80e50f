//! Frame-to-frame motion detection and M-of-N voting.
//!
//! A pair of frames is compared in grayscale: pixels whose absolute
//! difference exceeds the noise level count as moving, optionally limited to
//! the white pixels of a mask. `MotionDetector` applies this to a stream,
//! keeping the last frame in which motion was seen as its reference so that
//! slow changes accumulate until they cross the noise level.

use std::collections::VecDeque;

use crate::debug::{emit_gray, DebugSink};
use crate::frame::Frame;
use crate::image::ops::{
    absdiff, bgr_to_gray, bitwise_and, count_nonzero, erode_n, nonzero_bounding_box,
    threshold_binary,
};
use crate::image::{ImageView, OwnedImage};
use crate::params::{ConsecutiveFrames, MotionParameters};
use crate::region::Region;
use crate::util::math::{check_unit, fraction_to_level};
use crate::util::{FrameMatchError, FrameMatchResult};

/// Erosion passes applied by `MotionDetector` before looking for motion.
const DETECTOR_ERODE_PASSES: u32 = 1;

/// A named grayscale mask; white (non-zero) pixels are analysed.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    name: String,
    image: OwnedImage<u8>,
}

impl Mask {
    pub fn new(name: impl Into<String>, image: OwnedImage<u8>) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Loads a mask image, named after its path.
    #[cfg(feature = "image-io")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> FrameMatchResult<Self> {
        let path = path.as_ref();
        let image = crate::image::io::load_mask(path)?;
        Ok(Self::new(path.display().to_string(), image))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }
}

/// Verdict of comparing one frame with its reference.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionResult {
    pub motion: bool,
    /// Bounding box of the moving pixels in full-frame coordinates.
    pub region: Option<Region>,
    /// The frame that was evaluated.
    pub frame: Frame,
    pub timestamp: f64,
}

fn check_mask(mask: &ImageView<'_, u8>, width: usize, height: usize) -> FrameMatchResult<()> {
    if (mask.width(), mask.height()) != (width, height) {
        return Err(FrameMatchError::SizeMismatch {
            expected_width: width,
            expected_height: height,
            width: mask.width(),
            height: mask.height(),
        });
    }
    Ok(())
}

/// Thresholded, optionally eroded difference of two grayscale images.
///
/// Returns the local bounding box of the surviving pixels.
fn moving_pixels(
    previous: ImageView<'_, u8>,
    current: ImageView<'_, u8>,
    mask: Option<ImageView<'_, u8>>,
    level: u8,
    erode_passes: u32,
    sink: Option<&dyn DebugSink>,
) -> FrameMatchResult<Option<Region>> {
    let diff = absdiff(previous, current)?;
    let diff = match mask {
        Some(mask) => bitwise_and(diff.view(), mask)?,
        None => diff,
    };
    emit_gray(sink, "absdiff", diff.view());

    let thresholded = threshold_binary(diff.view(), level);
    emit_gray(sink, "thresholded", thresholded.view());
    if erode_passes == 0 {
        return Ok(nonzero_bounding_box(thresholded.view()));
    }

    let eroded = erode_n(thresholded.view(), erode_passes);
    emit_gray(sink, "eroded", eroded.view());
    if count_nonzero(eroded.view()) == 0 {
        return Ok(None);
    }
    // Grow the box back by the pixel each erosion pass removed.
    Ok(nonzero_bounding_box(eroded.view())
        .map(|r| r.dilate(erode_passes))
        .and_then(|r| r.intersect(&Region::of_size(current.width(), current.height()))))
}

/// Compares two frames of the same size.
///
/// `motion` is true if any pixel (inside `mask`, when given) changed by more
/// than `noise_threshold * 255`.
pub fn detect(
    previous: &Frame,
    current: &Frame,
    mask: Option<ImageView<'_, u8>>,
    noise_threshold: f32,
) -> FrameMatchResult<MotionResult> {
    check_unit("noise_threshold", noise_threshold)?;
    if (previous.width(), previous.height()) != (current.width(), current.height()) {
        return Err(FrameMatchError::SizeMismatch {
            expected_width: previous.width(),
            expected_height: previous.height(),
            width: current.width(),
            height: current.height(),
        });
    }
    if let Some(mask) = &mask {
        check_mask(mask, current.width(), current.height())?;
    }
    let (prev, cur) = (previous.to_gray(), current.to_gray());
    let local = moving_pixels(
        prev.view(),
        cur.view(),
        mask,
        fraction_to_level(noise_threshold),
        0,
        None,
    )?;
    let (ox, oy) = current.origin();
    Ok(MotionResult {
        motion: local.is_some(),
        region: local.map(|r| r.translate(ox, oy)),
        frame: current.clone(),
        timestamp: current.timestamp(),
    })
}

/// Stateful motion detection over a stream of frames.
pub struct MotionDetector {
    level: u8,
    mask: Option<Mask>,
    region: Region,
    reference: Option<OwnedImage<u8>>,
}

impl MotionDetector {
    /// Analyses `region` of each frame; `mask`, if any, must be region-sized.
    pub fn new(noise_threshold: f32, mask: Option<Mask>, region: Region) -> FrameMatchResult<Self> {
        check_unit("noise_threshold", noise_threshold)?;
        Ok(Self {
            level: fraction_to_level(noise_threshold),
            mask,
            region,
            reference: None,
        })
    }

    pub fn from_params(
        params: &MotionParameters,
        mask: Option<Mask>,
        region: Region,
    ) -> FrameMatchResult<Self> {
        params.validate()?;
        Self::new(params.noise_threshold, mask, region)
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Compares `frame` with the reference.
    ///
    /// The first frame becomes the reference and yields `None`. The reference
    /// is replaced only when motion is detected.
    pub fn feed(
        &mut self,
        frame: &Frame,
        sink: Option<&dyn DebugSink>,
    ) -> FrameMatchResult<Option<MotionResult>> {
        let (x, y, w, h) = frame.local_area(&self.region)?;
        if let Some(mask) = &self.mask {
            check_mask(&mask.view(), w, h)?;
        }
        let gray = bgr_to_gray(frame.view().roi(x, y, w, h)?);

        let Some(reference) = &self.reference else {
            self.reference = Some(gray);
            return Ok(None);
        };
        if (reference.width(), reference.height()) != (w, h) {
            return Err(FrameMatchError::SizeMismatch {
                expected_width: reference.width(),
                expected_height: reference.height(),
                width: w,
                height: h,
            });
        }

        emit_gray(sink, "gray", gray.view());
        let local = moving_pixels(
            reference.view(),
            gray.view(),
            self.mask.as_ref().map(Mask::view),
            self.level,
            DETECTOR_ERODE_PASSES,
            sink,
        )?;
        let motion = local.is_some();
        if motion {
            self.reference = Some(gray);
        }
        let (ox, oy) = frame.origin();
        Ok(Some(MotionResult {
            motion,
            region: local.map(|r| r.translate(ox + x as i64, oy + y as i64)),
            frame: frame.clone(),
            timestamp: frame.timestamp(),
        }))
    }
}

/// Sliding window of the last N verdicts; votes once M of them are positive.
///
/// Positive verdicts carry a value. When the window votes it returns the
/// value of the earliest positive verdict still in the window and starts
/// over empty.
#[derive(Clone, Debug)]
pub struct VoteWindow<T> {
    rule: ConsecutiveFrames,
    window: VecDeque<Option<T>>,
    votes: usize,
}

impl<T> VoteWindow<T> {
    pub fn new(rule: ConsecutiveFrames) -> FrameMatchResult<Self> {
        rule.validate()?;
        Ok(Self {
            rule,
            window: VecDeque::with_capacity(rule.window),
            votes: 0,
        })
    }

    pub fn rule(&self) -> ConsecutiveFrames {
        self.rule
    }

    /// Positive verdicts currently in the window.
    pub fn votes(&self) -> usize {
        self.votes
    }

    /// Adds one verdict: `Some(value)` for positive, `None` for negative.
    pub fn push(&mut self, verdict: Option<T>) -> Option<T> {
        if verdict.is_some() {
            self.votes += 1;
        }
        self.window.push_back(verdict);
        if self.window.len() > self.rule.window {
            if let Some(Some(_)) = self.window.pop_front() {
                self.votes -= 1;
            }
        }
        if self.votes < self.rule.required {
            return None;
        }
        self.votes = 0;
        self.window.drain(..).flatten().next()
    }
}
