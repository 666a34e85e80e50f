//! Captured video frames.
//!
//! A `Frame` is an immutable, cheaply clonable BGR image with the time it was
//! captured. Cropped frames remember where they came from so that regions
//! reported against them are in the coordinates of the full video frame.

use std::fmt;
use std::sync::Arc;

use crate::image::ops::bgr_to_gray;
use crate::image::{Bgr, ImageView, OwnedImage};
use crate::region::Region;
use crate::util::{FrameMatchError, FrameMatchResult};

/// One video frame in BGR order.
#[derive(Clone, PartialEq)]
pub struct Frame {
    data: Arc<[Bgr]>,
    width: usize,
    height: usize,
    timestamp: f64,
    origin: (i64, i64),
}

impl Frame {
    /// Wraps a row-major BGR buffer of exactly `width * height` pixels.
    pub fn new(data: Vec<Bgr>, width: usize, height: usize, timestamp: f64) -> FrameMatchResult<Self> {
        let image = OwnedImage::new(data, width, height)?;
        Ok(Self::from_image(image, timestamp))
    }

    /// Wraps packed `b, g, r` bytes.
    pub fn from_bgr_bytes(
        bytes: &[u8],
        width: usize,
        height: usize,
        timestamp: f64,
    ) -> FrameMatchResult<Self> {
        let needed = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or(FrameMatchError::InvalidDimensions { width, height })?;
        if bytes.len() != needed {
            return Err(FrameMatchError::BufferTooSmall {
                needed,
                got: bytes.len(),
            });
        }
        let data = bytes
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        Self::new(data, width, height, timestamp)
    }

    /// Builds a frame by replicating a grayscale image into all three channels.
    pub fn from_gray(gray: ImageView<'_, u8>, timestamp: f64) -> Self {
        let mut data = Vec::with_capacity(gray.width() * gray.height());
        for row in gray.rows() {
            data.extend(row.iter().map(|&v| [v, v, v]));
        }
        Self {
            data: data.into(),
            width: gray.width(),
            height: gray.height(),
            timestamp,
            origin: (0, 0),
        }
    }

    /// Creates a frame filled with a single colour.
    pub fn filled(width: usize, height: usize, colour: Bgr, timestamp: f64) -> FrameMatchResult<Self> {
        Ok(Self::from_image(
            OwnedImage::filled(width, height, colour)?,
            timestamp,
        ))
    }

    /// Creates a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, timestamp: f64, f: F) -> FrameMatchResult<Self>
    where
        F: FnMut(usize, usize) -> Bgr,
    {
        Ok(Self::from_image(
            OwnedImage::from_fn(width, height, f)?,
            timestamp,
        ))
    }

    /// Wraps an owned BGR image.
    pub fn from_image(image: OwnedImage<Bgr>, timestamp: f64) -> Self {
        let width = image.width();
        let height = image.height();
        Self {
            data: image.into_data().into(),
            width,
            height,
            timestamp,
            origin: (0, 0),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Capture time in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Returns a copy with a different capture time; pixels are shared.
    pub fn with_timestamp(&self, timestamp: f64) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    /// The area this frame covers, in full-frame coordinates.
    pub fn bounds(&self) -> Region {
        Region::of_size(self.width, self.height).translate(self.origin.0, self.origin.1)
    }

    /// Top-left corner of this frame in full-frame coordinates.
    pub fn origin(&self) -> (i64, i64) {
        self.origin
    }

    /// Converts a full-frame region into pixel extents of this frame.
    ///
    /// The region is clipped to the frame first. Fails if nothing remains.
    pub fn local_area(&self, region: &Region) -> FrameMatchResult<(usize, usize, usize, usize)> {
        let bounds = self.bounds();
        let clipped = bounds
            .intersect(region)
            .ok_or(FrameMatchError::RegionOutsideFrame {
                region: *region,
                bounds,
            })?;
        Ok(clipped.translate(-self.origin.0, -self.origin.1).to_rect())
    }

    /// Borrowed view of the pixels.
    pub fn view(&self) -> ImageView<'_, Bgr> {
        ImageView::contiguous(&self.data, self.width, self.height)
    }

    /// Returns the pixel at `(x, y)` in frame-local coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Bgr> {
        self.view().get(x, y).copied()
    }

    /// Luma conversion used by the confirm and motion stages.
    pub fn to_gray(&self) -> OwnedImage<u8> {
        bgr_to_gray(self.view())
    }

    /// Copies the part of the frame inside `region`.
    ///
    /// The returned frame keeps its full-frame origin and timestamp.
    pub fn crop(&self, region: &Region) -> FrameMatchResult<Frame> {
        let (x, y, w, h) = self.local_area(region)?;
        let image = self.view().roi(x, y, w, h)?.to_owned_image();
        Ok(Self {
            origin: (self.origin.0 + x as i64, self.origin.1 + y as i64),
            ..Self::from_image(image, self.timestamp)
        })
    }

    /// Packed `b, g, r` bytes in row-major order.
    pub fn to_bgr_bytes(&self) -> Vec<u8> {
        self.data.iter().flatten().copied().collect()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timestamp", &self.timestamp)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
