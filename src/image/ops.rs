//! Per-pixel and morphological operations on 8-bit images.
//!
//! These are the building blocks of the confirm and motion stages. All
//! binary images use `0` for background and `255` for foreground.

use crate::image::{Bgr, ImageView, OwnedImage};
use crate::region::Region;
use crate::util::{FrameMatchError, FrameMatchResult};

const LUMA_B: u32 = 1868;
const LUMA_G: u32 = 9617;
const LUMA_R: u32 = 4899;
const LUMA_SHIFT: u32 = 14;

/// Converts a BGR pixel to luma with BT.601 weights in 14-bit fixed point.
#[inline]
pub fn luma(px: Bgr) -> u8 {
    let [b, g, r] = px.map(u32::from);
    ((b * LUMA_B + g * LUMA_G + r * LUMA_R + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// Converts a BGR image to grayscale.
pub fn bgr_to_gray(src: ImageView<'_, Bgr>) -> OwnedImage<u8> {
    let mut data = Vec::with_capacity(src.width() * src.height());
    for row in src.rows() {
        data.extend(row.iter().map(|&px| luma(px)));
    }
    OwnedImage::from_parts(data, src.width(), src.height())
}

fn check_same_size<A, B>(a: &ImageView<'_, A>, b: &ImageView<'_, B>) -> FrameMatchResult<()> {
    if a.width() != b.width() || a.height() != b.height() {
        return Err(FrameMatchError::SizeMismatch {
            expected_width: a.width(),
            expected_height: a.height(),
            width: b.width(),
            height: b.height(),
        });
    }
    Ok(())
}

fn zip_map<F>(a: ImageView<'_, u8>, b: ImageView<'_, u8>, f: F) -> FrameMatchResult<OwnedImage<u8>>
where
    F: Fn(u8, u8) -> u8,
{
    check_same_size(&a, &b)?;
    let mut data = Vec::with_capacity(a.width() * a.height());
    for (ra, rb) in a.rows().zip(b.rows()) {
        data.extend(ra.iter().zip(rb).map(|(&x, &y)| f(x, y)));
    }
    OwnedImage::new(data, a.width(), a.height())
}

/// Per-pixel absolute difference.
pub fn absdiff(a: ImageView<'_, u8>, b: ImageView<'_, u8>) -> FrameMatchResult<OwnedImage<u8>> {
    zip_map(a, b, |x, y| x.abs_diff(y))
}

/// Per-pixel bitwise AND, used to apply a mask.
pub fn bitwise_and(a: ImageView<'_, u8>, b: ImageView<'_, u8>) -> FrameMatchResult<OwnedImage<u8>> {
    zip_map(a, b, |x, y| x & y)
}

/// Sets pixels strictly greater than `level` to 255 and the rest to 0.
pub fn threshold_binary(src: ImageView<'_, u8>, level: u8) -> OwnedImage<u8> {
    map(src, |v| if v > level { 255 } else { 0 })
}

fn map<F: Fn(u8) -> u8>(src: ImageView<'_, u8>, f: F) -> OwnedImage<u8> {
    let mut data = Vec::with_capacity(src.width() * src.height());
    for row in src.rows() {
        data.extend(row.iter().map(|&v| f(v)));
    }
    OwnedImage::from_parts(data, src.width(), src.height())
}

/// Linearly stretches the pixel range to `0..=255`.
///
/// A constant image maps to all zeros.
pub fn normalize_min_max(src: ImageView<'_, u8>) -> OwnedImage<u8> {
    let (lo, hi) = src
        .rows()
        .flatten()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi <= lo {
        return map(src, |_| 0);
    }
    let scale = 255.0 / f32::from(hi - lo);
    map(src, |v| (f32::from(v - lo) * scale).round() as u8)
}

/// Erodes with a 3x3 cross-shaped structuring element.
///
/// Neighbours outside the image are ignored, so foreground touching the
/// border is not eaten away from that side.
pub fn erode_cross(src: ImageView<'_, u8>) -> OwnedImage<u8> {
    let (w, h) = (src.width(), src.height());
    let mut data = Vec::with_capacity(w * h);
    for y in 0..h {
        let up = y.checked_sub(1).and_then(|yy| src.row(yy));
        let down = src.row(y + 1);
        let Some(cur) = src.row(y) else { break };
        for x in 0..w {
            let mut v = cur[x];
            if x > 0 {
                v = v.min(cur[x - 1]);
            }
            if x + 1 < w {
                v = v.min(cur[x + 1]);
            }
            if let Some(up) = up {
                v = v.min(up[x]);
            }
            if let Some(down) = down {
                v = v.min(down[x]);
            }
            data.push(v);
        }
    }
    OwnedImage::from_parts(data, w, h)
}

/// Applies `erode_cross` `passes` times.
pub fn erode_n(src: ImageView<'_, u8>, passes: u32) -> OwnedImage<u8> {
    let mut out = src.to_owned_image();
    for _ in 0..passes {
        out = erode_cross(out.view());
    }
    out
}

/// Number of non-zero pixels.
pub fn count_nonzero(src: ImageView<'_, u8>) -> usize {
    src.rows().flatten().filter(|&&v| v != 0).count()
}

/// Bounding box of the non-zero pixels in image coordinates.
pub fn nonzero_bounding_box(src: ImageView<'_, u8>) -> Option<Region> {
    let mut extents: Option<(usize, usize, usize, usize)> = None;
    for (y, row) in src.rows().enumerate() {
        let Some(first) = row.iter().position(|&v| v != 0) else {
            continue;
        };
        let last = row.iter().rposition(|&v| v != 0).unwrap_or(first);
        extents = Some(match extents {
            None => (first, y, last, y),
            Some((x0, y0, x1, _)) => (x0.min(first), y0, x1.max(last), y),
        });
    }
    let (x0, y0, x1, y1) = extents?;
    Region::from_extents(x0 as i64, y0 as i64, x1 as i64 + 1, y1 as i64 + 1)
}
