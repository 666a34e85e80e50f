//! Error types for framematch.
//!
//! Errors fall into three groups. Configuration errors (bad parameters,
//! unreadable images, a reference image larger than the frame) are raised
//! immediately and never retried. Timeouts are test failures: the expected
//! condition never showed up on screen. `NoVideo` and the propagated
//! collaborator failures indicate that the rig itself is broken.

use crate::frame::Frame;
use crate::region::Region;
use thiserror::Error;

/// Result alias for framematch operations.
pub type FrameMatchResult<T> = std::result::Result<T, FrameMatchError>;

/// Errors that can occur when matching or polling frames.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FrameMatchError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The row stride is smaller than the row width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The backing buffer cannot hold the requested image.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A rectangle does not fit inside the image it indexes.
    #[error(
        "roi {width}x{height} at ({x}, {y}) is outside the {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Two images that must have the same size do not.
    #[error("size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    SizeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    /// A parameter is out of range or could not be parsed.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    /// The reference image does not fit in the searched area.
    #[error(
        "reference image {tpl_width}x{tpl_height} is larger than the \
         {area_width}x{area_height} search area"
    )]
    TemplateTooLarge {
        tpl_width: usize,
        tpl_height: usize,
        area_width: usize,
        area_height: usize,
    },
    /// The requested search region does not overlap the frame.
    #[error("{region} does not overlap the frame {bounds}")]
    RegionOutsideFrame { region: Region, bounds: Region },
    /// Loading or saving an image failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
    /// `wait_for_match` ran out of time.
    #[error(transparent)]
    MatchTimeout(#[from] MatchTimeout),
    /// `wait_for_motion` ran out of time.
    #[error(transparent)]
    MotionTimeout(#[from] MotionTimeout),
    /// A generic `wait_until` ran out of time.
    #[error(transparent)]
    WaitTimeout(#[from] WaitTimeout),
    /// The frame source delivered nothing before the deadline.
    #[error("no video frames received within {timeout_secs} seconds")]
    NoVideo { timeout_secs: f64 },
    /// The frame source failed.
    #[error("frame source failed: {reason}")]
    FrameSource { reason: String },
    /// The remote control failed to send a key.
    #[error("remote control failed: {reason}")]
    RemoteControl { reason: String },
    /// The wait was aborted through a cancel token.
    #[error("cancelled")]
    Cancelled,
}

impl FrameMatchError {
    /// Returns true for errors caused by invalid inputs or parameters.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimensions { .. }
                | Self::InvalidStride { .. }
                | Self::BufferTooSmall { .. }
                | Self::RoiOutOfBounds { .. }
                | Self::SizeMismatch { .. }
                | Self::InvalidParameter { .. }
                | Self::TemplateTooLarge { .. }
                | Self::RegionOutsideFrame { .. }
                | Self::ImageIo { .. }
        )
    }

    /// Returns true when the device under test did not show what was expected.
    pub fn is_test_failure(&self) -> bool {
        matches!(
            self,
            Self::MatchTimeout(_) | Self::MotionTimeout(_) | Self::WaitTimeout(_)
        )
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Raised when a reference image was not found before the deadline.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("didn't find match for '{expected}' within {timeout_secs} seconds")]
pub struct MatchTimeout {
    /// The last frame that was checked.
    pub screenshot: Frame,
    /// Name of the reference image that was searched for.
    pub expected: String,
    /// Region of the frame that was searched.
    pub region: Region,
    /// How long the search ran for.
    pub timeout_secs: f64,
}

/// Raised when no motion was seen before the deadline.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("didn't find motion{} within {timeout_secs} seconds", mask_suffix(.mask))]
pub struct MotionTimeout {
    /// The last frame that was checked.
    pub screenshot: Frame,
    /// Name of the mask, if one was used.
    pub mask: Option<String>,
    /// Region of the frame that was analysed.
    pub region: Region,
    /// How long the search ran for.
    pub timeout_secs: f64,
}

fn mask_suffix(mask: &Option<String>) -> String {
    match mask {
        Some(name) => format!(" (with mask '{name}')"),
        None => String::new(),
    }
}

/// Raised when a `wait_until` predicate never succeeded.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("condition not met within {timeout_secs} seconds")]
pub struct WaitTimeout {
    /// The last frame the predicate was evaluated on.
    pub screenshot: Frame,
    /// How long the wait ran for.
    pub timeout_secs: f64,
}
