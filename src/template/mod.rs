//! Reference images and their precomputed search assets.

use crate::frame::Frame;
use crate::image::{Bgr, ImageView, OwnedImage};
use crate::util::FrameMatchResult;

mod compiled;
mod plan;

pub use compiled::CompiledTemplate;
pub use plan::TemplatePlan;

/// A named reference image in BGR format.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    name: String,
    img: OwnedImage<Bgr>,
}

impl Template {
    /// Creates a template from a contiguous BGR buffer.
    pub fn new(
        name: impl Into<String>,
        data: Vec<Bgr>,
        width: usize,
        height: usize,
    ) -> FrameMatchResult<Self> {
        let img = OwnedImage::new(data, width, height)?;
        Ok(Self::from_image(name, img))
    }

    /// Wraps an owned BGR image.
    pub fn from_image(name: impl Into<String>, img: OwnedImage<Bgr>) -> Self {
        Self {
            name: name.into(),
            img,
        }
    }

    /// Uses the pixels of a frame (for example a cropped screenshot).
    pub fn from_frame(name: impl Into<String>, frame: &Frame) -> Self {
        Self::from_image(name, frame.view().to_owned_image())
    }

    /// Loads a reference image from disk, named after its path.
    #[cfg(feature = "image-io")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> FrameMatchResult<Self> {
        let path = path.as_ref();
        let frame = crate::image::io::load_frame(path)?;
        Ok(Self::from_frame(path.display().to_string(), &frame))
    }

    /// Name used in timeout messages and debug output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a borrowed view of the template data.
    pub fn view(&self) -> ImageView<'_, Bgr> {
        self.img.view()
    }

    pub fn width(&self) -> usize {
        self.img.width()
    }

    pub fn height(&self) -> usize {
        self.img.height()
    }
}
