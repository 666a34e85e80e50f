//! Numeric helpers shared by the matcher, confirmer and motion detector.

use crate::util::{FrameMatchError, FrameMatchResult};
use std::time::Duration;

/// Converts a `[0, 1]` fraction of the 8-bit range to a pixel threshold.
///
/// Pixels whose difference is strictly greater than the returned level are
/// considered to differ.
pub(crate) fn fraction_to_level(fraction: f32) -> u8 {
    (fraction.clamp(0.0, 1.0) * 255.0) as u8
}

/// Validates that a parameter is a finite fraction in `[0, 1]`.
pub(crate) fn check_unit(name: &'static str, value: f32) -> FrameMatchResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(FrameMatchError::invalid_parameter(
            name,
            format!("{value} is outside [0, 1]"),
        ));
    }
    Ok(())
}

/// Converts a timeout in seconds to a `Duration`, rejecting negative or NaN values.
pub(crate) fn timeout_from_secs(timeout_secs: f64) -> FrameMatchResult<Duration> {
    Duration::try_from_secs_f64(timeout_secs).map_err(|err| {
        FrameMatchError::invalid_parameter("timeout_secs", format!("{timeout_secs}: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::{check_unit, fraction_to_level, timeout_from_secs};

    #[test]
    fn fraction_to_level_truncates() {
        assert_eq!(fraction_to_level(0.16), 40);
        assert_eq!(fraction_to_level(0.0), 0);
        assert_eq!(fraction_to_level(1.0), 255);
        assert_eq!(fraction_to_level(1.5), 255);
    }

    #[test]
    fn check_unit_rejects_out_of_range() {
        assert!(check_unit("t", 0.5).is_ok());
        assert!(check_unit("t", -0.1).is_err());
        assert!(check_unit("t", f32::NAN).is_err());
    }

    #[test]
    fn timeout_rejects_negative_values() {
        assert!(timeout_from_secs(0.25).is_ok());
        assert!(timeout_from_secs(-1.0).is_err());
        assert!(timeout_from_secs(f64::NAN).is_err());
    }
}
