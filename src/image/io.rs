//! Loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Decoding failures are
//! configuration errors (`FrameMatchError::ImageIo`).

use std::path::Path;

use crate::frame::Frame;
use crate::image::{Bgr, ImageView, OwnedImage};
use crate::util::{FrameMatchError, FrameMatchResult};

fn io_error(err: impl std::fmt::Display) -> FrameMatchError {
    FrameMatchError::ImageIo {
        reason: err.to_string(),
    }
}

/// Converts a decoded image to a BGR frame with timestamp 0.
pub fn frame_from_dynamic_image(img: &image::DynamicImage) -> FrameMatchResult<Frame> {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let data = rgb.pixels().map(|p| [p[2], p[1], p[0]]).collect();
    Frame::new(data, width, height, 0.0)
}

/// Loads a reference image or screenshot from disk.
pub fn load_frame<P: AsRef<Path>>(path: P) -> FrameMatchResult<Frame> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| io_error(format!("{}: {err}", path.display())))?;
    frame_from_dynamic_image(&img)
}

/// Decodes an encoded image (PNG or JPEG) held in memory.
pub fn load_frame_from_memory(bytes: &[u8]) -> FrameMatchResult<Frame> {
    let img = image::load_from_memory(bytes).map_err(io_error)?;
    frame_from_dynamic_image(&img)
}

/// Loads a motion mask as 8-bit grayscale; white marks pixels to analyse.
pub fn load_mask<P: AsRef<Path>>(path: P) -> FrameMatchResult<OwnedImage<u8>> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| io_error(format!("{}: {err}", path.display())))?;
    let gray = img.to_luma8();
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    OwnedImage::new(gray.into_raw(), width, height)
}

/// Writes a grayscale image; the format follows the file extension.
pub fn save_gray<P: AsRef<Path>>(path: P, img: ImageView<'_, u8>) -> FrameMatchResult<()> {
    let mut buf = Vec::with_capacity(img.width() * img.height());
    for row in img.rows() {
        buf.extend_from_slice(row);
    }
    let out = image::GrayImage::from_raw(img.width() as u32, img.height() as u32, buf)
        .ok_or_else(|| io_error("buffer does not match image size"))?;
    out.save(path).map_err(io_error)
}

/// Writes a BGR image; the format follows the file extension.
pub fn save_bgr<P: AsRef<Path>>(path: P, img: ImageView<'_, Bgr>) -> FrameMatchResult<()> {
    let mut buf = Vec::with_capacity(img.width() * img.height() * 3);
    for row in img.rows() {
        buf.extend(row.iter().flat_map(|&[b, g, r]| [r, g, b]));
    }
    let out = image::RgbImage::from_raw(img.width() as u32, img.height() as u32, buf)
        .ok_or_else(|| io_error("buffer does not match image size"))?;
    out.save(path).map_err(io_error)
}
