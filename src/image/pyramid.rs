//! Image pyramid construction.
//!
//! Downsampling uses a 2x2 box filter with integer rounding per channel:
//! `dst = ((a + b + c + d) + 2) / 4`. Odd trailing rows and columns are
//! dropped, so level `n` is `floor(w / 2^n) x floor(h / 2^n)`.

use crate::image::{Bgr, ImageView, OwnedImage};
use crate::util::{FrameMatchError, FrameMatchResult};

/// Pixel types that can be averaged by the 2x2 box filter.
pub trait Downsample: Copy {
    /// Averages four neighbouring pixels with round-half-up.
    fn box4(a: Self, b: Self, c: Self, d: Self) -> Self;
}

impl Downsample for u8 {
    #[inline]
    fn box4(a: u8, b: u8, c: u8, d: u8) -> u8 {
        let sum = u16::from(a) + u16::from(b) + u16::from(c) + u16::from(d);
        ((sum + 2) / 4) as u8
    }
}

impl Downsample for Bgr {
    #[inline]
    fn box4(a: Bgr, b: Bgr, c: Bgr, d: Bgr) -> Bgr {
        [
            u8::box4(a[0], b[0], c[0], d[0]),
            u8::box4(a[1], b[1], c[1], d[1]),
            u8::box4(a[2], b[2], c[2], d[2]),
        ]
    }
}

/// Halves an image with the 2x2 box filter.
///
/// Returns `None` when the source is narrower or shorter than two pixels.
pub fn downsample<T: Downsample>(src: ImageView<'_, T>) -> FrameMatchResult<Option<OwnedImage<T>>> {
    if src.width() < 2 || src.height() < 2 {
        return Ok(None);
    }
    let dst_width = src.width() / 2;
    let dst_height = src.height() / 2;
    let dst_len = dst_width
        .checked_mul(dst_height)
        .ok_or(FrameMatchError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        })?;
    let mut dst = Vec::with_capacity(dst_len);

    for y in 0..dst_height {
        let (Some(row0), Some(row1)) = (src.row(y * 2), src.row(y * 2 + 1)) else {
            return Err(FrameMatchError::BufferTooSmall {
                needed: (y * 2 + 1) * src.stride() + src.width(),
                got: src.as_slice().len(),
            });
        };
        for x in 0..dst_width {
            dst.push(T::box4(
                row0[2 * x],
                row0[2 * x + 1],
                row1[2 * x],
                row1[2 * x + 1],
            ));
        }
    }

    OwnedImage::new(dst, dst_width, dst_height).map(Some)
}

/// Number of pyramid levels usable for a template of the given size.
///
/// The coarsest template must stay at least 2x2, otherwise every placement
/// scores alike and the coarse pass cannot rank candidates.
pub fn max_safe_levels(tpl_width: usize, tpl_height: usize, requested: usize) -> usize {
    let mut levels = 1;
    let (mut w, mut h) = (tpl_width, tpl_height);
    while levels < requested && w / 2 >= 2 && h / 2 >= 2 {
        w /= 2;
        h /= 2;
        levels += 1;
    }
    levels
}

/// Owned image pyramid built from a base level.
pub struct ImagePyramid<T = u8> {
    levels: Vec<OwnedImage<T>>,
}

impl<T: Downsample> ImagePyramid<T> {
    /// Builds a pyramid from a base view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always present.
    pub fn build(base: ImageView<'_, T>, max_levels: usize) -> FrameMatchResult<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = vec![base.to_owned_image()];

        while levels.len() < max_levels {
            let Some(prev) = levels.last() else { break };
            match downsample(prev.view())? {
                Some(next) => levels.push(next),
                None => break,
            }
        }

        Ok(Self { levels })
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[OwnedImage<T>] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns a view for a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, T>> {
        self.levels.get(index).map(|level| level.view())
    }
}

#[cfg(test)]
mod tests {
    use super::{downsample, max_safe_levels, ImagePyramid};
    use crate::image::OwnedImage;

    #[test]
    fn box_filter_rounds_half_up() {
        let img = OwnedImage::new(vec![1u8, 2, 9, 9, 0, 0, 9, 9, 7, 7, 7, 7], 4, 3).unwrap();
        let half = downsample(img.view()).unwrap().unwrap();
        assert_eq!((half.width(), half.height()), (2, 1));
        // (1 + 2 + 0 + 0 + 2) / 4 = 1, (9 * 4 + 2) / 4 = 9
        assert_eq!(half.data(), &[1, 9]);
    }

    #[test]
    fn bgr_channels_are_filtered_independently() {
        let img = OwnedImage::new(vec![[0u8, 10, 255]; 4], 2, 2).unwrap();
        let half = downsample(img.view()).unwrap().unwrap();
        assert_eq!(half.data(), &[[0, 10, 255]]);
    }

    #[test]
    fn pyramid_stops_at_single_pixel() {
        let img = OwnedImage::filled(5, 3, 0u8).unwrap();
        let pyr = ImagePyramid::build(img.view(), 8).unwrap();
        assert_eq!(pyr.len(), 2);
        let top = pyr.level(1).unwrap();
        assert_eq!((top.width(), top.height()), (2, 1));
    }

    #[test]
    fn safe_levels_keep_template_at_least_two_pixels() {
        assert_eq!(max_safe_levels(64, 32, 2), 2);
        assert_eq!(max_safe_levels(64, 32, 8), 5);
        assert_eq!(max_safe_levels(3, 40, 3), 1);
        assert_eq!(max_safe_levels(4, 4, 0), 1);
    }
}
