//! Debug artefacts: intermediate images produced while matching.
//!
//! A `DebugSink` receives each named intermediate image (grayscale ROI,
//! difference mask, before and after erosion). Sinks are a side channel:
//! a failing sink never changes a verdict, and write errors are only logged.

#[cfg(feature = "image-io")]
use std::path::{Path, PathBuf};
#[cfg(feature = "image-io")]
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::image::{Bgr, ImageView, OwnedImage};
#[cfg(feature = "image-io")]
use crate::trace::trace_event;
#[cfg(feature = "image-io")]
use crate::util::{FrameMatchError, FrameMatchResult};

/// Receiver for named intermediate images.
pub trait DebugSink: Send + Sync {
    /// Records a grayscale or binary image.
    fn gray(&self, name: &str, image: ImageView<'_, u8>);

    /// Records a colour image.
    fn bgr(&self, name: &str, image: ImageView<'_, Bgr>);
}

pub(crate) fn emit_gray(sink: Option<&dyn DebugSink>, name: &str, image: ImageView<'_, u8>) {
    if let Some(sink) = sink {
        sink.gray(name, image);
    }
}

pub(crate) fn emit_bgr(sink: Option<&dyn DebugSink>, name: &str, image: ImageView<'_, Bgr>) {
    if let Some(sink) = sink {
        sink.bgr(name, image);
    }
}

/// Prefixes every name with `prefix/` before forwarding.
pub struct Scoped<'a> {
    inner: &'a dyn DebugSink,
    prefix: String,
}

impl<'a> Scoped<'a> {
    pub fn new(inner: &'a dyn DebugSink, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }
}

impl DebugSink for Scoped<'_> {
    fn gray(&self, name: &str, image: ImageView<'_, u8>) {
        self.inner.gray(&format!("{}/{name}", self.prefix), image);
    }

    fn bgr(&self, name: &str, image: ImageView<'_, Bgr>) {
        self.inner.bgr(&format!("{}/{name}", self.prefix), image);
    }
}

/// One recorded image.
#[derive(Clone, Debug, PartialEq)]
pub enum Artefact {
    Gray(OwnedImage<u8>),
    Bgr(OwnedImage<Bgr>),
}

/// Keeps every artefact in memory, in arrival order.
#[derive(Default)]
pub struct MemorySink {
    items: Mutex<Vec<(String, Artefact)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names recorded so far.
    pub fn names(&self) -> Vec<String> {
        self.items.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    /// The most recent artefact recorded under `name`.
    pub fn get(&self, name: &str) -> Option<Artefact> {
        self.items
            .lock()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a.clone())
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl DebugSink for MemorySink {
    fn gray(&self, name: &str, image: ImageView<'_, u8>) {
        self.items
            .lock()
            .push((name.to_owned(), Artefact::Gray(image.to_owned_image())));
    }

    fn bgr(&self, name: &str, image: ImageView<'_, Bgr>) {
        self.items
            .lock()
            .push((name.to_owned(), Artefact::Bgr(image.to_owned_image())));
    }
}

/// Writes each artefact as a numbered PNG under a directory.
///
/// Names may contain `/`, which become subdirectories.
#[cfg(feature = "image-io")]
pub struct DiskSink {
    root: PathBuf,
    seq: AtomicUsize,
}

#[cfg(feature = "image-io")]
impl DiskSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seq: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut path = self.root.clone();
        let mut parts = name.split('/').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                path.push(part);
            } else {
                path.push(format!("{seq:05}-{part}.png"));
            }
        }
        path
    }

    fn write<F>(&self, name: &str, save: F)
    where
        F: FnOnce(&Path) -> FrameMatchResult<()>,
    {
        let path = self.path_for(name);
        let result = match path.parent() {
            Some(dir) => std::fs::create_dir_all(dir).map_err(|err| FrameMatchError::ImageIo {
                reason: err.to_string(),
            }),
            None => Ok(()),
        }
        .and_then(|()| save(&path));
        if let Err(err) = result {
            let reason = err.to_string();
            trace_event!("debug_write_failed", name = name, reason = reason.as_str());
        }
    }
}

#[cfg(feature = "image-io")]
impl DebugSink for DiskSink {
    fn gray(&self, name: &str, image: ImageView<'_, u8>) {
        self.write(name, |path| crate::image::io::save_gray(path, image));
    }

    fn bgr(&self, name: &str, image: ImageView<'_, Bgr>) {
        self.write(name, |path| crate::image::io::save_bgr(path, image));
    }
}

#[cfg(test)]
mod tests {
    use super::{Artefact, DebugSink, MemorySink, Scoped};
    use crate::image::OwnedImage;

    #[test]
    fn scoped_names_are_prefixed() {
        let mem = MemorySink::new();
        let scoped = Scoped::new(&mem, "match0");
        let img = OwnedImage::filled(2, 2, 7u8).unwrap();
        scoped.gray("diff", img.view());
        assert_eq!(mem.names(), vec!["match0/diff".to_owned()]);
        assert_eq!(mem.get("match0/diff"), Some(Artefact::Gray(img)));
    }

    #[cfg(feature = "image-io")]
    #[test]
    fn disk_paths_are_numbered() {
        let sink = super::DiskSink::new("/tmp/dbg");
        let a = sink.path_for("confirm/absdiff");
        let b = sink.path_for("frame");
        assert!(a.ends_with("confirm/00000-absdiff.png"));
        assert!(b.ends_with("00001-frame.png"));
    }
}
