//! Matching and motion parameters.
//!
//! Parameters are plain values with public fields. Every public entry point
//! calls `validate()` before doing any work, so an out-of-range value is a
//! configuration error rather than a silently clamped default.

use std::fmt;
use std::str::FromStr;

use crate::util::math::check_unit;
use crate::util::{FrameMatchError, FrameMatchResult};

/// Correlation metric used by the pyramid matcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MatchMethod {
    /// Normalized sum of squared differences, inverted so higher is better.
    #[default]
    SqdiffNormed,
    /// Normalized cross-correlation.
    CcorrNormed,
    /// Normalized correlation coefficient (mean-removed).
    CcoeffNormed,
}

impl MatchMethod {
    pub const ALL: [MatchMethod; 3] = [
        MatchMethod::SqdiffNormed,
        MatchMethod::CcorrNormed,
        MatchMethod::CcoeffNormed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::SqdiffNormed => "sqdiff-normed",
            MatchMethod::CcorrNormed => "ccorr-normed",
            MatchMethod::CcoeffNormed => "ccoeff-normed",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMethod {
    type Err = FrameMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                FrameMatchError::invalid_parameter("match_method", format!("unknown method `{s}`"))
            })
    }
}

/// Pixel-accurate check applied to candidates that clear the match threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConfirmMethod {
    /// Trust the matcher.
    None,
    /// Threshold the absolute difference of the grayscale images.
    #[default]
    Absdiff,
    /// Stretch both images to the full range first, then as `Absdiff`.
    NormedAbsdiff,
}

impl ConfirmMethod {
    pub const ALL: [ConfirmMethod; 3] = [
        ConfirmMethod::None,
        ConfirmMethod::Absdiff,
        ConfirmMethod::NormedAbsdiff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmMethod::None => "none",
            ConfirmMethod::Absdiff => "absdiff",
            ConfirmMethod::NormedAbsdiff => "normed-absdiff",
        }
    }
}

impl fmt::Display for ConfirmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmMethod {
    type Err = FrameMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfirmMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                FrameMatchError::invalid_parameter(
                    "confirm_method",
                    format!("unknown method `{s}`"),
                )
            })
    }
}

/// Parameters for locating and confirming a reference image.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchParameters {
    pub match_method: MatchMethod,
    /// Minimum certainty in `[0, 1]` for a candidate.
    pub match_threshold: f32,
    pub confirm_method: ConfirmMethod,
    /// Fraction of 255 a grayscale pixel must differ by to count as different.
    pub confirm_threshold: f32,
    /// Erosion passes applied to the difference mask before it is inspected.
    pub erode_passes: u32,
    /// Pyramid depth including full resolution; 1 disables the pyramid.
    pub pyramid_levels: usize,
}

impl Default for MatchParameters {
    fn default() -> Self {
        Self {
            match_method: MatchMethod::SqdiffNormed,
            match_threshold: 0.80,
            confirm_method: ConfirmMethod::Absdiff,
            confirm_threshold: 0.16,
            erode_passes: 1,
            pyramid_levels: 2,
        }
    }
}

impl MatchParameters {
    /// Checks every field, returning the first offending one.
    pub fn validate(&self) -> FrameMatchResult<()> {
        check_unit("match_threshold", self.match_threshold)?;
        check_unit("confirm_threshold", self.confirm_threshold)?;
        if self.pyramid_levels == 0 {
            return Err(FrameMatchError::invalid_parameter(
                "pyramid_levels",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// "M of the last N frames" voting rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsecutiveFrames {
    /// Votes required.
    pub required: usize,
    /// Window length.
    pub window: usize,
}

impl ConsecutiveFrames {
    pub fn new(required: usize, window: usize) -> FrameMatchResult<Self> {
        let cf = Self { required, window };
        cf.validate()?;
        Ok(cf)
    }

    pub fn validate(&self) -> FrameMatchResult<()> {
        if self.window == 0 || self.required == 0 {
            return Err(FrameMatchError::invalid_parameter(
                "consecutive_frames",
                "M and N must be at least 1",
            ));
        }
        if self.required > self.window {
            return Err(FrameMatchError::invalid_parameter(
                "consecutive_frames",
                format!("M ({}) exceeds N ({})", self.required, self.window),
            ));
        }
        Ok(())
    }
}

impl Default for ConsecutiveFrames {
    fn default() -> Self {
        Self {
            required: 10,
            window: 20,
        }
    }
}

impl fmt::Display for ConsecutiveFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.required == self.window {
            write!(f, "{}", self.window)
        } else {
            write!(f, "{}/{}", self.required, self.window)
        }
    }
}

impl FromStr for ConsecutiveFrames {
    type Err = FrameMatchError;

    /// Parses `"N"` (N of N) or `"M/N"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim().parse::<usize>().map_err(|_| {
                FrameMatchError::invalid_parameter(
                    "consecutive_frames",
                    format!("expected \"N\" or \"M/N\", got `{s}`"),
                )
            })
        };
        match s.split_once('/') {
            Some((m, n)) => Self::new(parse(m)?, parse(n)?),
            None => {
                let n = parse(s)?;
                Self::new(n, n)
            }
        }
    }
}

/// Parameters for motion detection.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionParameters {
    /// Fraction of 255 a grayscale pixel must change by to count as motion.
    pub noise_threshold: f32,
    pub consecutive_frames: ConsecutiveFrames,
}

impl Default for MotionParameters {
    fn default() -> Self {
        Self {
            noise_threshold: 0.16,
            consecutive_frames: ConsecutiveFrames::default(),
        }
    }
}

impl MotionParameters {
    pub fn validate(&self) -> FrameMatchResult<()> {
        check_unit("noise_threshold", self.noise_threshold)?;
        self.consecutive_frames.validate()
    }
}

/// Parameters for `press_until_match`.
#[derive(Clone, Debug, PartialEq)]
pub struct PressParameters {
    /// How long to look for the match after each press.
    pub interval_secs: f64,
    /// Presses to attempt before giving up.
    pub max_presses: u32,
}

impl Default for PressParameters {
    fn default() -> Self {
        Self {
            interval_secs: 3.0,
            max_presses: 10,
        }
    }
}

impl PressParameters {
    pub fn validate(&self) -> FrameMatchResult<()> {
        if !self.interval_secs.is_finite() || self.interval_secs < 0.0 {
            return Err(FrameMatchError::invalid_parameter(
                "interval_secs",
                format!("{} is not a non-negative number of seconds", self.interval_secs),
            ));
        }
        Ok(())
    }
}
